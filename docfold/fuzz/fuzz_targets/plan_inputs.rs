#![no_main]

use docfold::config::{MergeLimits, OutputFormat};
use docfold::executor::plan_segments;
use docfold::input::InputFile;
use docfold::plan::{MemorySnapshot, plan};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let s = std::str::from_utf8(data).unwrap_or("");
    let sizes = data.iter().map(|b| u64::from(*b) << 22);

    let files: Vec<InputFile> = s
        .split_whitespace()
        .zip(sizes)
        .map(|(name, size)| InputFile::new(name, size))
        .collect();

    let limits = MergeLimits::default();
    let snapshot = MemorySnapshot::new(data.len() as u64 * 1024 * 1024, 16 << 30);
    for format in [OutputFormat::Pdf, OutputFormat::Pptx] {
        let plan = plan(&files, Path::new("out.pdf"), format, snapshot, &limits);
        if files.is_empty() {
            assert!(plan.route.is_none());
        }
        assert!(plan.mode != docfold::plan::MergeMode::Fast || plan.total_bytes <= plan.memory_limit_bytes);
    }

    // ranges are contiguous and cover every page
    let pages = data.first().copied().map_or(0, u32::from);
    let size = data.len() as u64 * limits.split_trigger_bytes / 3;
    let spans = plan_segments(size, pages, limits.split_trigger_bytes);
    let mut next = 1;
    for span in &spans {
        assert_eq!(span.start, next);
        assert!(span.end >= span.start);
        next = span.end + 1;
    }
    assert_eq!(next - 1, pages);
});
