use super::{temp_path_for, ArchiveRewriter, RewriteError};
use crate::limits::TraceLimits;
use crate::trace::{LineScanError, ShortenOutcome, SNIP_MARKER};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn write_archive(path: &Path, entries: &[(&str, Vec<u8>)], comment: &str) {
    let file = File::create(path).expect("must create archive");
    let mut writer = ZipWriter::new(file);
    writer.set_comment(comment);
    for (name, data) in entries {
        let method = if name.starts_with("resources/") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        writer
            .start_file(*name, SimpleFileOptions::default().compression_method(method))
            .expect("must start entry");
        writer.write_all(data).expect("must write entry");
    }
    writer.finish().expect("must finish archive");
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).expect("must open")).expect("must parse");
    (0..archive.len())
        .map(|index| {
            let mut entry = archive.by_index(index).expect("must read entry");
            let mut data = Vec::new();
            entry.read_to_end(&mut data).expect("must read entry data");
            (entry.name().to_string(), data)
        })
        .collect()
}

fn trace_line(text: &str) -> String {
    json!({
        "type": "before",
        "callId": "call@1",
        "metadata": {"params": {"arg": {"value": {"s": text}}}}
    })
    .to_string()
}

fn lines(data: &[u8]) -> Vec<&[u8]> {
    let text = data.strip_suffix(b"\n").unwrap_or(data);
    text.split(|byte| *byte == b'\n').collect()
}

/// A 1,200,000 byte record whose bulk is insignificant whitespace and whose
/// target string has 90 characters.
fn padded_line(total: usize) -> String {
    let text = format!("{}{}{}", "H".repeat(40), "m".repeat(10), "T".repeat(40));
    let body = format!("\"metadata\":{{\"params\":{{\"arg\":{{\"value\":{{\"s\":\"{text}\"}}}}}}}}}}");
    let head = "{\"type\":\"before\",";
    let pad = total - head.len() - body.len();
    format!("{head}{}{body}", " ".repeat(pad))
}

#[test]
fn end_to_end_cleans_trace_and_drops_large_resources() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("abc123.zip");
    let long_line = padded_line(1_200_000);
    assert_eq!(long_line.len(), 1_200_000);
    let trace = format!(
        "{}\n{}\n{}\n",
        json!({"type": "context-options", "version": 6}),
        long_line,
        json!({"type": "after", "callId": "call@1"})
    );
    let small_blob = vec![7u8; 500];
    write_archive(
        &path,
        &[
            ("trace.trace", trace.clone().into_bytes()),
            ("resources/big.blob", vec![1u8; 2_000_000]),
            ("resources/small.blob", small_blob.clone()),
        ],
        "",
    );

    let report = ArchiveRewriter::default().rewrite(&path).expect("rewrite must succeed");

    let entries = read_entries(&path);
    let names = entries.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["trace.trace", "resources/small.blob"]);
    assert_eq!(entries[1].1, small_blob);

    let output_lines = lines(&entries[0].1);
    assert_eq!(output_lines.len(), 3);
    let input_lines = lines(trace.as_bytes());
    assert_eq!(output_lines[0], input_lines[0]);
    assert_eq!(output_lines[2], input_lines[2]);
    assert!(output_lines[1].len() <= 1_000_000);
    let shortened: Value = serde_json::from_slice(output_lines[1]).expect("must stay JSON");
    assert_eq!(
        shortened["metadata"]["params"]["arg"]["value"]["s"],
        json!(format!("{}{}{}", "H".repeat(40), SNIP_MARKER, "T".repeat(40)))
    );

    assert_eq!(report.entries_read, 3);
    assert_eq!(report.entries_written, 2);
    assert_eq!(report.dropped_resources.len(), 1);
    assert_eq!(report.dropped_resources[0].name, "resources/big.blob");
    assert_eq!(report.dropped_resources[0].size, 2_000_000);
    assert_eq!(report.trace_lines, 3);
    assert_eq!(report.oversized_lines, 1);
    assert!(report.anomalies.is_empty());
    assert!(report.bytes_after.is_some());
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn huge_target_string_is_elided_below_threshold() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("big-string.zip");
    let trace = format!("{}\n", trace_line(&"x".repeat(1_200_000)));
    write_archive(&path, &[("trace.trace", trace.into_bytes())], "");

    let report = ArchiveRewriter::default().rewrite(&path).expect("rewrite must succeed");

    let entries = read_entries(&path);
    let output_lines = lines(&entries[0].1);
    assert_eq!(output_lines.len(), 1);
    assert_eq!(
        output_lines[0],
        trace_line(&format!("{}{}{}", "x".repeat(40), SNIP_MARKER, "x".repeat(40))).as_bytes()
    );
    assert_eq!(report.oversized_lines, 1);
}

#[test]
fn retained_entries_keep_order_and_bytes() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("order.zip");
    let limits = TraceLimits {
        max_resource_file_size: 100,
        max_trace_line_length: 64,
        ..TraceLimits::default()
    };
    let inputs = vec![
        ("trace.network", b"{\"type\":\"resource-snapshot\"}\n".to_vec()),
        ("resources/a.png", vec![1u8; 101]),
        ("resources/b.css", b"body{}".to_vec()),
        ("trace.trace", b"{\"type\":\"before\"}\n".to_vec()),
        ("resources/c.jpeg", vec![2u8; 5_000]),
        ("trace.stacks", vec![3u8; 5_000]),
    ];
    write_archive(&path, &inputs, "");
    let before = read_entries(&path);

    let report = ArchiveRewriter::new(limits).rewrite(&path).expect("rewrite must succeed");

    let after = read_entries(&path);
    let expected = before
        .into_iter()
        .filter(|(name, _)| name != "resources/a.png" && name != "resources/c.jpeg")
        .collect::<Vec<_>>();
    assert_eq!(after, expected);
    assert_eq!(report.entries_read, 6);
    assert_eq!(report.entries_written, 4);
}

#[test]
fn pass_through_entries_keep_compression_metadata() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("raw.zip");
    write_archive(
        &path,
        &[
            ("trace.stacks", b"stack ".repeat(2_000)),
            ("resources/s.txt", b"stored".to_vec()),
        ],
        "",
    );
    let describe = |path: &Path| {
        let mut archive = ZipArchive::new(File::open(path).expect("must open")).expect("must parse");
        (0..archive.len())
            .map(|index| {
                let entry = archive.by_index_raw(index).expect("must read");
                (entry.compression(), entry.compressed_size(), entry.crc32())
            })
            .collect::<Vec<_>>()
    };
    let before = describe(path.as_path());

    ArchiveRewriter::default().rewrite(&path).expect("rewrite must succeed");

    assert_eq!(describe(path.as_path()), before);
}

#[test]
fn short_lines_pass_through_with_newline_normalised() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("short.zip");
    let trace = b"{\"a\":1}\r\n{ \"b\" : 2 }\n\nnot json at all".to_vec();
    write_archive(&path, &[("trace.trace", trace)], "");

    let report = ArchiveRewriter::default().rewrite(&path).expect("rewrite must succeed");

    let entries = read_entries(&path);
    assert_eq!(
        entries[0].1,
        b"{\"a\":1}\n{ \"b\" : 2 }\n\nnot json at all\n".to_vec()
    );
    assert_eq!(report.trace_lines, 4);
    assert_eq!(report.oversized_lines, 0);
}

#[test]
fn malformed_oversized_line_is_kept_and_reported() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("malformed.zip");
    let broken = format!("{{\"metadata\": \"{}", "b".repeat(300));
    let trace = format!("{}\n{broken}\n", trace_line("ok"));
    write_archive(&path, &[("trace.trace", trace.clone().into_bytes())], "");
    let limits = TraceLimits {
        max_trace_line_length: 200,
        ..TraceLimits::default()
    };

    let report = ArchiveRewriter::new(limits).rewrite(&path).expect("rewrite must succeed");

    assert_eq!(read_entries(&path)[0].1, trace.into_bytes());
    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.anomalies[0].line, 2);
    assert_eq!(report.anomalies[0].input_length, broken.len());
    assert!(matches!(
        report.anomalies[0].outcome,
        ShortenOutcome::ParseFailed { .. }
    ));
}

#[test]
fn still_too_long_line_is_written_and_flagged() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("still-long.zip");
    let line = json!({"type": "frame-snapshot", "snapshot": {"html": "h".repeat(500)}}).to_string();
    write_archive(&path, &[("trace.trace", format!("{line}\n").into_bytes())], "");
    let limits = TraceLimits {
        max_trace_line_length: 100,
        ..TraceLimits::default()
    };

    let report = ArchiveRewriter::new(limits).rewrite(&path).expect("rewrite must succeed");

    assert_eq!(read_entries(&path)[0].1, format!("{line}\n").into_bytes());
    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(
        report.anomalies[0].outcome,
        ShortenOutcome::StillTooLong { length: line.len() }
    );
}

#[test]
fn archive_comment_is_preserved() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("comment.zip");
    write_archive(&path, &[("trace.trace", b"{}\n".to_vec())], "playwright trace");

    ArchiveRewriter::default().rewrite(&path).expect("rewrite must succeed");

    let archive = ZipArchive::new(File::open(&path).expect("must open")).expect("must parse");
    assert_eq!(archive.comment(), b"playwright trace");
}

#[test]
fn scan_overflow_aborts_and_leaves_original_untouched() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("overflow.zip");
    let trace = format!("{}\n{}\n", trace_line("ok"), "y".repeat(4_096));
    write_archive(
        &path,
        &[
            ("resources/big.blob", vec![9u8; 50]),
            ("trace.trace", trace.into_bytes()),
        ],
        "",
    );
    let original = fs::read(&path).expect("must read original");
    let limits = TraceLimits {
        max_resource_file_size: 10,
        max_trace_line_length: 256,
        max_scan_line_length: 1_024,
    };

    let error = ArchiveRewriter::new(limits)
        .rewrite(&path)
        .expect_err("rewrite must fail");

    match &error {
        RewriteError::ScanEntry { entry, source, .. } => {
            assert_eq!(entry, "trace.trace");
            assert!(matches!(source, LineScanError::TooLong { line: 2, limit: 1_024 }));
        }
        other => panic!("expected scan error, got {other:?}"),
    }
    assert!(error.to_string().contains("overflow.zip"));
    assert_eq!(fs::read(&path).expect("must read original"), original);
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn unreadable_archive_fails_without_creating_temp_file() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("broken.zip");
    fs::write(&path, b"this is not a zip archive").expect("must write");

    let error = ArchiveRewriter::default()
        .rewrite(&path)
        .expect_err("rewrite must fail");

    assert!(matches!(error, RewriteError::OpenArchive { .. }));
    assert_eq!(fs::read(&path).expect("must read"), b"this is not a zip archive");
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn missing_archive_reports_open_error() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let error = ArchiveRewriter::default()
        .rewrite(&dir.path().join("absent.zip"))
        .expect_err("rewrite must fail");
    assert!(matches!(error, RewriteError::OpenFile { .. }));
}

#[test]
fn inspect_reports_without_touching_the_archive() {
    let dir = tempfile::tempdir().expect("must create temp dir");
    let path = dir.path().join("inspect.zip");
    let trace = format!("{}\n{}\n", trace_line("short"), trace_line(&"z".repeat(500)));
    write_archive(
        &path,
        &[
            ("trace.trace", trace.into_bytes()),
            ("resources/big.blob", vec![0u8; 200]),
        ],
        "",
    );
    let original = fs::read(&path).expect("must read original");
    let limits = TraceLimits {
        max_resource_file_size: 100,
        max_trace_line_length: 300,
        ..TraceLimits::default()
    };

    let report = ArchiveRewriter::new(limits).inspect(&path).expect("inspect must succeed");

    assert!(report.dry_run);
    assert_eq!(report.trace_lines, 2);
    assert_eq!(report.oversized_lines, 1);
    assert_eq!(report.dropped_resources.len(), 1);
    assert_eq!(report.entries_written, 1);
    assert_eq!(report.bytes_after, None);
    assert_eq!(fs::read(&path).expect("must read"), original);
    assert!(!temp_path_for(&path).exists());
}

#[test]
fn temp_path_appends_suffix() {
    assert_eq!(
        temp_path_for(Path::new("report/data/abc.zip")),
        Path::new("report/data/abc.zip.new")
    );
}
