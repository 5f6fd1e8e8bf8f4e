use dupefinder::output::{
    ConsoleSink, MemorySink, OutputItem, OutputPipeline, OutputSink, PipelineState, Severity,
    LINE_ENDING,
};
use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct BrokenSink;

impl OutputSink for BrokenSink {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn write_info(&mut self, _item: &OutputItem) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }

    fn write_error(&mut self, _item: &OutputItem) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
    }
}

#[test]
fn test_deferred_items_reach_log_only_after_flush() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let pipeline = OutputPipeline::builder().with_log_file(&log).build().unwrap();

    for message in ["one", "two", "three"] {
        pipeline.ingest(message);
    }
    pipeline.ingest(OutputItem::new("later-1").deferred(true));
    pipeline.ingest(OutputItem::new("later-2").deferred(true));

    pipeline.handle().wait_drained();
    let before = fs::read_to_string(&log).unwrap();
    assert_eq!(before, format!("one{nl}two{nl}three{nl}", nl = LINE_ENDING));

    pipeline.flush_deferred();
    let after = fs::read_to_string(&log).unwrap();
    assert_eq!(
        after,
        format!("one{nl}two{nl}three{nl}later-1{nl}later-2{nl}", nl = LINE_ENDING)
    );

    pipeline.shutdown();
}

#[test]
fn test_discarded_items_reach_no_sink() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let console = ConsoleSink::with_writers(Box::new(out.clone()), Box::new(err.clone()), false);

    let pipeline = OutputPipeline::builder()
        .with_sink(Box::new(console))
        .with_log_file(&log)
        .build()
        .unwrap();
    pipeline.ingest(OutputItem::new("secret").discard(true));
    pipeline.ingest(OutputItem::new("secret-error").error().discard(true));
    pipeline.ingest("visible");
    let stats = pipeline.shutdown();

    assert_eq!(stats.delivered, 1);
    assert!(!out.text().contains("secret"));
    assert!(!err.text().contains("secret"));
    assert!(!fs::read_to_string(&log).unwrap().contains("secret"));
}

#[test]
fn test_console_routes_errors_and_colors() {
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let console = ConsoleSink::with_writers(Box::new(out.clone()), Box::new(err.clone()), true);

    let pipeline = OutputPipeline::builder()
        .with_sink(Box::new(console))
        .build()
        .unwrap();
    pipeline.ingest(OutputItem::new("fine").severity(Severity::Success));
    pipeline.ingest(OutputItem::new("bad").severity(Severity::Error).error());
    pipeline.shutdown();

    let stdout = out.text();
    let stderr = err.text();
    assert!(stdout.contains("fine"));
    assert!(!stdout.contains("bad"));
    assert!(stderr.contains("bad"));
    // ANSI escape for the color change and reset
    assert!(stdout.contains('\u{1b}'));
    assert!(stderr.contains('\u{1b}'));
}

#[test]
fn test_broken_sink_does_not_starve_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let pipeline = OutputPipeline::builder()
        .with_sink(Box::new(BrokenSink))
        .with_log_file(&log)
        .build()
        .unwrap();

    pipeline.ingest("a");
    pipeline.ingest("b");
    let stats = pipeline.shutdown();

    assert_eq!(stats.sink_failures, 2);
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        format!("a{nl}b{nl}", nl = LINE_ENDING)
    );
}

#[test]
fn test_handles_from_many_threads_all_delivered() {
    let memory = MemorySink::new();
    let pipeline = OutputPipeline::builder()
        .with_sink(Box::new(memory.clone()))
        .build()
        .unwrap();

    std::thread::scope(|scope| {
        for t in 0..8 {
            let handle = pipeline.handle();
            scope.spawn(move || {
                for i in 0..100 {
                    handle.ingest(format!("{t}:{i}"));
                }
            });
        }
    });

    assert_eq!(pipeline.state(), PipelineState::Running);
    let stats = pipeline.shutdown();
    assert_eq!(stats.delivered, 800);
    assert_eq!(memory.items().len(), 800);
}
