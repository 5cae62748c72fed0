//! Background runs of the full pipeline.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::pipeline::processor::HdrProcessor;

const WORKER_NAME: &str = "lumen-worker";

impl HdrProcessor {
    /// Run [`produce_and_save`](Self::produce_and_save) on a worker thread.
    ///
    /// Parameters are copied before this returns, so later setter calls do
    /// not affect the run. `on_done` receives the result on the worker
    /// thread. Fails only if the thread cannot be spawned.
    pub fn spawn_produce_and_save<F>(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
        filename: impl Into<String>,
        on_done: F,
    ) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(Option<PathBuf>) + Send + 'static,
    {
        let params = self.parameters();
        let processor = Arc::clone(self);
        let path = path.into();
        let filename = filename.into();

        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let result = processor.run(&path, &filename, &params);
                on_done(result);
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::image::{ChannelOrder, PixelBuffer};
    use crate::io::save_image;

    #[test]
    fn test_background_run_uses_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        save_image(&PixelBuffer::filled(4, 4, ChannelOrder::Rgb, 50u8), &input, 3).unwrap();

        let processor = Arc::new(HdrProcessor::new(dir.path().join("out")));
        processor.set_exposure(2.0);

        let (tx, rx) = mpsc::channel();
        let handle = processor
            .spawn_produce_and_save(&input, "result.png", move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        processor.set_exposure(4.0);
        handle.join().unwrap();

        let written = rx.recv().unwrap().unwrap();
        assert_eq!(written, dir.path().join("out/result.png"));
        let back = image::open(&written).unwrap().to_rgb8();
        assert!(back.pixels().all(|p| p.0 == [100, 100, 100]));
    }

    #[test]
    fn test_concurrent_runs_to_one_name_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        save_image(&PixelBuffer::filled(200, 200, ChannelOrder::Rgb, 60u8), &input, 3).unwrap();

        let out_dir = dir.path().join("out");
        let processor = Arc::new(HdrProcessor::new(&out_dir));
        processor.set_exposure(2.0);

        let (tx, rx) = mpsc::channel();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tx = tx.clone();
                processor
                    .spawn_produce_and_save(&input, "same.png", move |result| {
                        let _ = tx.send(result);
                    })
                    .unwrap()
            })
            .collect();
        drop(tx);
        for handle in handles {
            handle.join().unwrap();
        }

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.as_deref() == Some(out_dir.join("same.png").as_path())));
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
        let back = image::open(out_dir.join("same.png")).unwrap().to_rgb8();
        assert!(back.pixels().all(|p| p.0 == [120, 120, 120]));
    }

    #[test]
    fn test_background_failure_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let processor = Arc::new(HdrProcessor::new(dir.path()));

        let (tx, rx) = mpsc::channel();
        processor
            .spawn_produce_and_save(dir.path().join("nope.png"), "x.png", move |result| {
                let _ = tx.send(result);
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(rx.recv().unwrap(), None);
        assert!(!dir.path().join("x.png").exists());
    }
}
