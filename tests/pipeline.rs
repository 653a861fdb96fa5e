//! End-to-end checks of the two flows through the public API.
//!
//! Local crop: a real PNG on disk goes through `RustBackend`, the result is
//! recorded in a file-backed ledger, then saved to an album directory.
//! Share link: fixture parse, ledger record, mark as saved.

use image::{Rgba, RgbaImage};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use unmark::album::Album;
use unmark::history::Ledger;
use unmark::imaging::{
    DisplaySize, Preset, Rectangle, RegionInput, RustBackend, process_selected,
};
use unmark::parse::{FixtureSource, parse_share_text};
use unmark::storage::FileStore;
use unmark::types::{MediaKind, RecordKind, SelectedMedia};

fn row_color(y: u32) -> Rgba<u8> {
    Rgba([(y % 256) as u8, (y / 256) as u8, 7, 255])
}

fn write_striped_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |_, y| row_color(y));
    img.save(path).unwrap();
}

#[test]
fn crop_record_and_save() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("photo.png");
    write_striped_png(&input, 40, 300);

    let media = SelectedMedia::from_path(&input).unwrap();
    let result = process_selected(
        &RustBackend::new(),
        &media,
        RegionInput::Source(Rectangle::band(100, 50, 40)),
        &tmp.path().join("out"),
    )
    .unwrap();

    let out = image::open(&result.path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (40, 250));
    assert_eq!(*out.get_pixel(5, 99), row_color(99));
    assert_eq!(*out.get_pixel(5, 100), row_color(150));
    assert_eq!(*out.get_pixel(5, 249), row_color(299));

    let store = FileStore::new(tmp.path().join("data"));
    let ledger = Ledger::new(&store);
    let entry = ledger.add(result.to_new_entry()).unwrap();
    assert_eq!(entry.kind, RecordKind::FromImage);

    let album = Album::new(tmp.path().join("album"), Duration::from_secs(5)).unwrap();
    assert!(album.check_permission());
    let saved = album.save_image(&result.path.to_string_lossy()).unwrap();
    assert!(saved.starts_with(tmp.path().join("album")));
    ledger.mark_as_saved(&entry.id).unwrap();

    // A fresh ledger over the same directory sees the persisted state.
    let reopened = Ledger::new(FileStore::new(tmp.path().join("data")));
    let stored = reopened.get(&entry.id).unwrap();
    assert!(stored.saved_to_album);
    assert_eq!(reopened.count(), 1);
}

#[test]
fn bottom_preset_on_preview() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("tall.png");
    write_striped_png(&input, 60, 800);

    let media = SelectedMedia::from_path(&input).unwrap();
    let preview = DisplaySize {
        width: 30.0,
        height: 400.0,
    };
    let result = process_selected(
        &RustBackend::new(),
        &media,
        RegionInput::Preset(Preset::Bottom, preview, 60.0),
        tmp.path(),
    )
    .unwrap();

    assert_eq!(result.region, Rectangle::new(0, 680, 60, 120));
    assert_eq!(result.output.height, 680);
}

#[test]
fn video_file_is_refused() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("clip.mp4");
    std::fs::write(&input, b"not really a video").unwrap();

    let media = SelectedMedia::from_path(&input).unwrap();
    let err = process_selected(
        &RustBackend::new(),
        &media,
        RegionInput::Source(Rectangle::band(0, 10, 10)),
        tmp.path(),
    )
    .unwrap_err();
    assert!(matches!(err, unmark::imaging::CropError::UnsupportedMedia(_)));
}

#[test]
fn parsed_link_is_recorded_newest_first() {
    let tmp = TempDir::new().unwrap();
    let store = FileStore::new(tmp.path());
    let ledger = Ledger::new(&store);

    let first = parse_share_text(&FixtureSource, "https://v.kuaishou.com/abc").unwrap();
    let second = parse_share_text(
        &FixtureSource,
        "看看这个 http://xhslink.com/a/Bc1 复制后打开小红书",
    )
    .unwrap();
    let a = ledger.add(first.to_new_entry()).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let b = ledger.add(second.to_new_entry()).unwrap();

    let list = ledger.list();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, b.id);
    assert_eq!(list[1].id, a.id);
    assert_eq!(list[0].media_type, MediaKind::ImageSet);
    assert_eq!(list[0].result_urls.len(), 3);

    assert!(ledger.delete(&a.id));
    assert_eq!(ledger.count(), 1);
    assert!(ledger.clear());
    assert!(ledger.list().is_empty());
}
