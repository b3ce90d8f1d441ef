//! End-to-end tests for heap files over disk-backed storage.
//!
//! Each test creates its heap files in a fresh temporary directory, opens
//! them through a real `FileStorage`-backed buffer pool, and drives them
//! exclusively through the public heap API.

use std::collections::HashSet;

use recstore::heap::{
    create_heap_file, destroy_heap_file, CompareOp, DataPage, Datatype, FileHeader, HeapFile,
    HeapFileError, HeapFileScan, InsertFileScan, FILE_HEADER_SIZE, HEADER_PAGE,
};
use recstore::storage::{
    BufferPool, BufferPoolConfig, ClockReplacer, FileManager, FileStorage, PageId, MAX_NAME_SIZE,
};
use tempfile::{tempdir, TempDir};

fn file_manager() -> (TempDir, FileManager) {
    let dir = tempdir().unwrap();
    let files = FileManager::new(dir.path());
    (dir, files)
}

async fn open_pool(
    files: &FileManager,
    name: &str,
    frames: usize,
) -> BufferPool<FileStorage, ClockReplacer> {
    let storage = files.open(name).await.unwrap();
    BufferPool::new(
        storage,
        ClockReplacer::with_capacity(frames),
        BufferPoolConfig { pool_size: frames },
    )
}

/// Record with an i32 at offset 0, padded with the value's low byte.
fn int_record(value: i32, len: usize) -> Vec<u8> {
    let mut record = vec![value as u8; len];
    record[..4].copy_from_slice(&value.to_le_bytes());
    record
}

async fn collect_scan(
    scan: &mut HeapFileScan<'_, FileStorage, ClockReplacer>,
) -> Vec<recstore::heap::Rid> {
    let mut rids = Vec::new();
    while let Some(rid) = scan.scan_next().await.unwrap() {
        rids.push(rid);
    }
    rids
}

#[tokio::test]
async fn create_then_open_round_trip() {
    let (_dir, files) = file_manager();

    create_heap_file(&files, "t1").await.unwrap();
    assert!(matches!(
        create_heap_file(&files, "t1").await,
        Err(HeapFileError::FileExists(_))
    ));

    let pool = open_pool(&files, "t1", 8).await;
    let file = HeapFile::open(&pool).await.unwrap();
    assert_eq!(file.file_name(), "t1");
    assert_eq!(file.rec_cnt(), 0);
    assert_eq!(file.page_cnt(), 1);
    file.close().await.unwrap();

    // A fresh file's chain is a single page: first == last.
    let guard = pool.fetch_page(HEADER_PAGE).await.unwrap();
    let header = FileHeader::read_from(&guard[..FILE_HEADER_SIZE]).unwrap();
    assert_eq!(header.first_page, header.last_page);
    assert_eq!(header.first_page, PageId::new(1));
}

#[tokio::test]
async fn create_rejects_overlong_name() {
    let (_dir, files) = file_manager();
    let name = "n".repeat(MAX_NAME_SIZE);
    assert!(matches!(
        create_heap_file(&files, &name).await,
        Err(HeapFileError::InvalidName(_))
    ));
    assert!(!files.exists(&name));
}

#[tokio::test]
async fn destroy_then_recreate() {
    let (_dir, files) = file_manager();

    create_heap_file(&files, "gone").await.unwrap();
    destroy_heap_file(&files, "gone").await.unwrap();
    assert!(!files.exists("gone"));
    assert!(files.open("gone").await.is_err());

    create_heap_file(&files, "gone").await.unwrap();
    let pool = open_pool(&files, "gone", 8).await;
    let file = HeapFile::open(&pool).await.unwrap();
    assert_eq!(file.rec_cnt(), 0);
}

#[tokio::test]
async fn insert_then_get_returns_identical_bytes() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "t").await.unwrap();
    let pool = open_pool(&files, "t", 8).await;

    let payloads: Vec<Vec<u8>> = vec![
        b"short".to_vec(),
        vec![0xAB; 1000],
        (0..=255u8).collect(),
    ];

    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for payload in &payloads {
            rids.push(insert.insert_record(payload).await.unwrap());
        }
        insert.close().await.unwrap();
    }

    let mut file = HeapFile::open(&pool).await.unwrap();
    for (rid, payload) in rids.iter().zip(&payloads) {
        assert_eq!(file.record(*rid).await.unwrap(), payload.as_slice());
    }
    file.close().await.unwrap();
}

#[tokio::test]
async fn thousand_inserts_overflow_many_pages() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "big").await.unwrap();
    let pool = open_pool(&files, "big", 16).await;

    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for i in 0..1000 {
            rids.push(insert.insert_record(&int_record(i, 100)).await.unwrap());
        }
        assert_eq!(insert.rec_cnt(), 1000);
        assert!(insert.page_cnt() >= 10, "page_cnt = {}", insert.page_cnt());
        insert.close().await.unwrap();
    }

    // All record ids are distinct and span more than one page.
    let distinct: HashSet<_> = rids.iter().copied().collect();
    assert_eq!(distinct.len(), 1000);
    assert!(rids.iter().any(|rid| rid.page_id != rids[0].page_id));

    // An unfiltered scan yields every record, in insertion order.
    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    let seen = collect_scan(&mut scan).await;
    assert_eq!(seen, rids);
    scan.close().await.unwrap();
}

#[tokio::test]
async fn chain_walk_matches_header_counters() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "chain").await.unwrap();
    let pool = open_pool(&files, "chain", 16).await;

    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for i in 0..200 {
            insert.insert_record(&int_record(i, 200)).await.unwrap();
        }
        insert.close().await.unwrap();
    }

    let header = {
        let guard = pool.fetch_page(HEADER_PAGE).await.unwrap();
        FileHeader::read_from(&guard[..FILE_HEADER_SIZE]).unwrap()
    };

    // Follow next-page links: every data page exactly once, ending at
    // last_page, with live-record totals adding up to rec_cnt.
    let mut visited = HashSet::new();
    let mut live_records = 0;
    let mut next = Some(header.first_page);
    let mut last_seen = header.first_page;
    while let Some(page_id) = next {
        assert!(visited.insert(page_id), "chain revisited {:?}", page_id);
        let guard = pool.fetch_page(page_id).await.unwrap();
        let page = DataPage::new(&*guard);
        live_records += page.record_count() as u32;
        last_seen = page_id;
        next = page.next_page();
    }

    assert_eq!(visited.len() as u32, header.page_cnt);
    assert_eq!(last_seen, header.last_page);
    assert_eq!(live_records, header.rec_cnt);
}

#[tokio::test]
async fn filtered_scan_selects_greater_than() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "f").await.unwrap();
    let pool = open_pool(&files, "f", 8).await;

    let mut rids = Vec::new();
    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for value in [10, 20, 30, 40, 50] {
            rids.push(insert.insert_record(&int_record(value, 40)).await.unwrap());
        }
        insert.close().await.unwrap();
    }

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    scan.start_scan(0, 4, Datatype::Integer, Some(&25i32.to_le_bytes()), CompareOp::Gt)
        .unwrap();

    let seen = collect_scan(&mut scan).await;
    assert_eq!(seen, &rids[2..]); // 30, 40, 50 in insertion order
    scan.close().await.unwrap();
}

#[tokio::test]
async fn mark_and_reset_replay_the_inner_side() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "m").await.unwrap();
    let pool = open_pool(&files, "m", 8).await;

    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for value in [10, 20, 30, 40, 50] {
            insert.insert_record(&int_record(value, 40)).await.unwrap();
        }
        insert.close().await.unwrap();
    }

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    scan.start_scan(0, 4, Datatype::Integer, Some(&25i32.to_le_bytes()), CompareOp::Gt)
        .unwrap();

    scan.scan_next().await.unwrap().unwrap(); // 30
    scan.mark_scan().unwrap();

    let forty = scan.scan_next().await.unwrap().unwrap();
    scan.scan_next().await.unwrap().unwrap(); // 50

    scan.reset_scan().await.unwrap();
    assert_eq!(scan.scan_next().await.unwrap(), Some(forty));
    scan.close().await.unwrap();
}

#[tokio::test]
async fn delete_during_scan_shrinks_later_scans() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "d").await.unwrap();
    let pool = open_pool(&files, "d", 8).await;

    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for value in [10, 20, 30, 40, 50] {
            insert.insert_record(&int_record(value, 40)).await.unwrap();
        }
        insert.close().await.unwrap();
    }

    let filter = 25i32.to_le_bytes();
    {
        let mut scan = HeapFileScan::open(&pool).await.unwrap();
        scan.start_scan(0, 4, Datatype::Integer, Some(&filter), CompareOp::Gt)
            .unwrap();
        scan.scan_next().await.unwrap().unwrap(); // 30
        scan.delete_record().unwrap();
        assert_eq!(scan.rec_cnt(), 4);
        scan.close().await.unwrap();
    }

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    assert_eq!(scan.rec_cnt(), 4);
    scan.start_scan(0, 4, Datatype::Integer, Some(&filter), CompareOp::Gt)
        .unwrap();
    let mut values = Vec::new();
    while scan.scan_next().await.unwrap().is_some() {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&scan.record().unwrap()[..4]);
        values.push(i32::from_le_bytes(buf));
    }
    assert_eq!(values, vec![40, 50]);
    scan.close().await.unwrap();
}

#[tokio::test]
async fn string_and_float_filters() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "sf").await.unwrap();
    let pool = open_pool(&files, "sf", 8).await;

    // Records: 4-byte float, then a 3-byte tag.
    let make = |value: f32, tag: &[u8; 3]| {
        let mut record = Vec::with_capacity(7);
        record.extend_from_slice(&value.to_le_bytes());
        record.extend_from_slice(tag);
        record
    };

    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for (value, tag) in [(0.5f32, b"aaa"), (1.5, b"abc"), (2.5, b"zzz")] {
            insert.insert_record(&make(value, tag)).await.unwrap();
        }
        insert.close().await.unwrap();
    }

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    scan.start_scan(0, 4, Datatype::Float, Some(&1.0f32.to_le_bytes()), CompareOp::Ge)
        .unwrap();
    assert_eq!(collect_scan(&mut scan).await.len(), 2);
    scan.close().await.unwrap();

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    scan.start_scan(4, 3, Datatype::String, Some(b"abc"), CompareOp::Eq)
        .unwrap();
    let rids = collect_scan(&mut scan).await;
    assert_eq!(rids.len(), 1);
    scan.close().await.unwrap();
}

#[tokio::test]
async fn in_place_update_with_mark_dirty_persists() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "u").await.unwrap();

    {
        let pool = open_pool(&files, "u", 8).await;
        {
            let mut insert = InsertFileScan::open(&pool).await.unwrap();
            insert.insert_record(b"before....").await.unwrap();
            insert.close().await.unwrap();
        }

        let mut scan = HeapFileScan::open(&pool).await.unwrap();
        scan.scan_next().await.unwrap().unwrap();
        scan.record_mut().unwrap()[..6].copy_from_slice(b"after.");
        scan.mark_dirty().unwrap();
        scan.close().await.unwrap();
    }

    // Reopen from disk: the mutation must have been written back.
    let pool = open_pool(&files, "u", 8).await;
    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    scan.scan_next().await.unwrap().unwrap();
    assert_eq!(scan.record().unwrap(), b"after.....".as_slice());
    scan.close().await.unwrap();
}

#[tokio::test]
async fn records_persist_across_reopen() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "p").await.unwrap();

    let mut rids = Vec::new();
    {
        let pool = open_pool(&files, "p", 8).await;
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for i in 0..100 {
            rids.push(insert.insert_record(&int_record(i, 64)).await.unwrap());
        }
        insert.close().await.unwrap();
    }

    let pool = open_pool(&files, "p", 8).await;
    let mut file = HeapFile::open(&pool).await.unwrap();
    assert_eq!(file.rec_cnt(), 100);
    for (i, rid) in rids.iter().enumerate() {
        assert_eq!(file.record(*rid).await.unwrap(), int_record(i as i32, 64));
    }
    file.close().await.unwrap();
}

#[tokio::test]
async fn tiny_pool_forces_eviction_during_scan() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "e").await.unwrap();
    let pool = open_pool(&files, "e", 4).await;

    {
        let mut insert = InsertFileScan::open(&pool).await.unwrap();
        for i in 0..50 {
            insert.insert_record(&int_record(i, 400)).await.unwrap();
        }
        insert.close().await.unwrap();
    }

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    assert!(scan.page_cnt() > 1);
    assert_eq!(collect_scan(&mut scan).await.len(), 50);
    scan.close().await.unwrap();
}

#[tokio::test]
async fn handles_pin_exactly_two_pages() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "pins").await.unwrap();
    let pool = open_pool(&files, "pins", 8).await;

    let mut insert = InsertFileScan::open(&pool).await.unwrap();
    assert_eq!(pool.pinned_count(), 2);
    insert.insert_record(b"x").await.unwrap();
    assert_eq!(pool.pinned_count(), 2);
    insert.close().await.unwrap();
    assert_eq!(pool.pinned_count(), 0);

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    assert_eq!(pool.pinned_count(), 2);
    scan.scan_next().await.unwrap().unwrap();
    assert_eq!(pool.pinned_count(), 2);
    scan.close().await.unwrap();
    assert_eq!(pool.pinned_count(), 0);
}

#[tokio::test]
async fn bad_scan_parameters_are_rejected() {
    let (_dir, files) = file_manager();
    create_heap_file(&files, "bad").await.unwrap();
    let pool = open_pool(&files, "bad", 8).await;

    let mut scan = HeapFileScan::open(&pool).await.unwrap();
    let four = [0u8; 4];

    assert!(matches!(
        scan.start_scan(0, 0, Datatype::String, Some(b""), CompareOp::Eq),
        Err(HeapFileError::BadScanParam(_))
    ));
    assert!(matches!(
        scan.start_scan(0, 3, Datatype::Integer, Some(&four[..3]), CompareOp::Eq),
        Err(HeapFileError::BadScanParam(_))
    ));
    assert!(matches!(
        scan.start_scan(0, 8, Datatype::Float, Some(&[0u8; 8]), CompareOp::Eq),
        Err(HeapFileError::BadScanParam(_))
    ));
    assert!(matches!(
        scan.start_scan(0, 4, Datatype::Integer, Some(&four[..2]), CompareOp::Eq),
        Err(HeapFileError::BadScanParam(_))
    ));

    // A null filter is always acceptable and clears prior state.
    scan.start_scan(0, 0, Datatype::Integer, None, CompareOp::Eq)
        .unwrap();
    scan.close().await.unwrap();
}
