//! Filesystem-level behaviour of the ramdisk, driven through `VfsOps` the
//! way a kernel bridge would.

use std::path::Path;
use std::sync::Arc;

use ramdisk_kernel::{
    BLOCK_SIZE, CHUNK_COST, ROOT_COST, Ramdisk, RamdiskConfig, VfsError, VfsOps, node_cost,
};

// ============================================================================
// Shared test setup
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("ramdisk_kernel=debug")
        .try_init();
}

fn ramdisk(size_mb: u64) -> Ramdisk {
    init_tracing();
    let config = RamdiskConfig::from_megabytes("/mnt/ram", size_mb).unwrap();
    Ramdisk::new(&config).unwrap()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

fn p(path: &str) -> &Path {
    Path::new(path)
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn nested_paths_resolve_at_any_depth() {
    let fs = ramdisk(1);
    let mut dir = String::new();
    for level in 0..8 {
        dir.push_str(&format!("/level{level}"));
        fs.mkdir(p(&dir), 0o040755).await.unwrap();
        let file = format!("{dir}/file{level}.txt");
        fs.create(p(&file), 0o100644).await.unwrap();
    }

    let mut dir = String::new();
    for level in 0..8 {
        dir.push_str(&format!("/level{level}"));
        assert!(fs.getattr(p(&dir)).await.unwrap().is_dir());
        let file = format!("{dir}/file{level}.txt");
        assert!(fs.getattr(p(&file)).await.unwrap().is_file(), "{file}");
    }

    fs.mkdir(p("/a"), 0o040755).await.unwrap();
    fs.mkdir(p("/a/b"), 0o040755).await.unwrap();
    fs.write_all(p("/a/b/c.txt"), b"three deep").await.unwrap();
    assert_eq!(fs.read_all(p("/a/b/c.txt")).await.unwrap(), b"three deep");
}

// ============================================================================
// Byte I/O
// ============================================================================

#[tokio::test]
async fn write_then_read_round_trips() {
    let fs = ramdisk(1);
    for n in [0, 1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, 10 * BLOCK_SIZE] {
        let path = format!("/file-{n}");
        fs.create(p(&path), 0o100644).await.unwrap();
        let data = pattern(n);

        let written = fs.write(p(&path), 0, &data).await.unwrap();
        assert_eq!(written as usize, n);

        let back = fs.read(p(&path), 0, n as u32).await.unwrap();
        assert_eq!(back, data, "round trip of {n} bytes");
        assert_eq!(fs.getattr(p(&path)).await.unwrap().size, n as u64);
    }
}

#[tokio::test]
async fn sequential_chunked_writes_match_single_write() {
    let fs = ramdisk(1);
    let data = pattern(5 * BLOCK_SIZE + 77);
    fs.create(p("/seq"), 0o100644).await.unwrap();

    // Odd-sized pieces so writes start and end mid-chunk.
    let mut offset = 0;
    for piece in data.chunks(300) {
        fs.write(p("/seq"), offset as u64, piece).await.unwrap();
        offset += piece.len();
    }

    assert_eq!(fs.read_all(p("/seq")).await.unwrap(), data);
    assert_eq!(
        fs.read(p("/seq"), 1000, 100).await.unwrap(),
        &data[1000..1100]
    );
}

#[tokio::test]
async fn reading_past_end_returns_nothing() {
    let fs = ramdisk(1);
    fs.write_all(p("/short"), b"tiny").await.unwrap();

    assert!(fs.read(p("/short"), 4, 10).await.unwrap().is_empty());
    assert!(fs.read(p("/short"), 4096, 10).await.unwrap().is_empty());
    assert_eq!(fs.read(p("/short"), 2, 10).await.unwrap(), b"ny");

    fs.create(p("/never-written"), 0o100644).await.unwrap();
    assert!(fs.read(p("/never-written"), 0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn truncate_is_idempotent() {
    let fs = ramdisk(1);
    let data = pattern(3 * BLOCK_SIZE + 10);
    fs.write_all(p("/t"), &data).await.unwrap();

    fs.truncate(p("/t"), 700).await.unwrap();
    let once_size = fs.getattr(p("/t")).await.unwrap().size;
    let once = fs.read_all(p("/t")).await.unwrap();
    let usage_once = fs.usage();

    fs.truncate(p("/t"), 700).await.unwrap();
    assert_eq!(fs.getattr(p("/t")).await.unwrap().size, once_size);
    assert_eq!(fs.read_all(p("/t")).await.unwrap(), once);
    assert_eq!(fs.usage(), usage_once);
    assert_eq!(once, &data[..700]);
}

#[tokio::test]
async fn truncate_then_grow_reads_zeros() {
    let fs = ramdisk(1);
    fs.write_all(p("/z"), &[0xFF; 1000]).await.unwrap();
    fs.truncate(p("/z"), 100).await.unwrap();
    fs.write(p("/z"), 100, &[1; 10]).await.unwrap();
    fs.write(p("/z"), 400, &[2; 10]).await.unwrap();

    let data = fs.read_all(p("/z")).await.unwrap();
    assert_eq!(data.len(), 410);
    assert!(data[..100].iter().all(|&b| b == 0xFF));
    assert!(data[100..110].iter().all(|&b| b == 1));
    assert!(data[110..400].iter().all(|&b| b == 0));
    assert!(data[400..].iter().all(|&b| b == 2));
}

// ============================================================================
// Capacity
// ============================================================================

#[tokio::test]
async fn capacity_is_never_exceeded() {
    init_tracing();
    let max = ROOT_COST + 3 * node_cost("/a".len()) + CHUNK_COST * 6;
    let fs = Ramdisk::with_max_size(max).unwrap();

    fs.create(p("/a"), 0o100644).await.unwrap();
    fs.write(p("/a"), 0, &pattern(4 * BLOCK_SIZE)).await.unwrap();
    assert!(fs.usage().curr_size <= max);

    // Needs three more chunks, only two fit.
    let before = fs.usage();
    let err = fs
        .write(p("/a"), 4 * BLOCK_SIZE as u64, &pattern(3 * BLOCK_SIZE))
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::OutOfSpace(_)));
    assert_eq!(fs.usage(), before);
    assert_eq!(fs.getattr(p("/a")).await.unwrap().size, 4 * BLOCK_SIZE as u64);

    // Two chunks still fit.
    fs.write(p("/a"), 4 * BLOCK_SIZE as u64, &pattern(2 * BLOCK_SIZE))
        .await
        .unwrap();

    fs.create(p("/b"), 0o100644).await.unwrap();
    fs.mkdir(p("/c"), 0o040755).await.unwrap();
    let before = fs.usage();
    assert!(matches!(
        fs.create(p("/d"), 0o100644).await,
        Err(VfsError::OutOfSpace(_))
    ));
    assert!(matches!(
        fs.mkdir(p("/e"), 0o040755).await,
        Err(VfsError::OutOfSpace(_))
    ));
    assert_eq!(fs.usage(), before);
    assert_eq!(fs.usage().curr_size, max);
    assert!(!fs.exists(p("/d")).await);
}

#[tokio::test]
async fn freed_nodes_and_chunks_return_their_units() {
    let fs = ramdisk(1);
    let start = fs.usage();

    fs.mkdir(p("/dir"), 0o040755).await.unwrap();
    fs.write_all(p("/dir/f"), &pattern(10 * BLOCK_SIZE + 3)).await.unwrap();
    assert_eq!(
        fs.usage().curr_size,
        start.curr_size + node_cost("/dir".len()) + node_cost("/dir/f".len()) + 11 * CHUNK_COST
    );

    fs.truncate(p("/dir/f"), BLOCK_SIZE as u64).await.unwrap();
    assert_eq!(
        fs.usage().curr_size,
        start.curr_size + node_cost("/dir".len()) + node_cost("/dir/f".len()) + CHUNK_COST
    );

    fs.unlink(p("/dir/f")).await.unwrap();
    fs.rmdir(p("/dir")).await.unwrap();
    assert_eq!(fs.usage(), start);
}

#[tokio::test]
async fn path_bytes_count_against_capacity() {
    init_tracing();
    let max = 64 * 1024;

    async fn fill(fs: &Ramdisk, dir: &str) -> usize {
        let mut created = 0;
        loop {
            let path = format!("{dir}/{created:05}");
            match fs.create(Path::new(&path), 0o100644).await {
                Ok(_) => created += 1,
                Err(VfsError::OutOfSpace(_)) => return created,
                Err(e) => panic!("unexpected error on {path}: {e}"),
            }
        }
    }

    let short = Ramdisk::with_max_size(max).unwrap();
    short.mkdir(p("/s"), 0o040755).await.unwrap();
    let short_count = fill(&short, "/s").await;

    // Same tree shape, but every file sits under 15 levels of 250-byte names.
    let long = Ramdisk::with_max_size(max).unwrap();
    let mut dir = String::new();
    for level in 0..15 {
        dir.push('/');
        dir.push_str(&format!("{level:02}").repeat(125));
        long.mkdir(p(&dir), 0o040755).await.unwrap();
    }
    let long_count = fill(&long, &dir).await;

    assert!(long_count * 4 < short_count, "{long_count} vs {short_count}");
    assert!(short.usage().curr_size <= max);
    assert!(long.usage().curr_size <= max);

    // Each node is charged for its path bytes on creation and refunded on removal.
    let before = short.usage().curr_size;
    short.unlink(p("/s/00000")).await.unwrap();
    assert_eq!(
        short.usage().curr_size,
        before - node_cost("/s/00000".len())
    );
}

#[tokio::test]
async fn statfs_reflects_capacity() {
    let fs = ramdisk(2);
    let stat = fs.statfs().await.unwrap();
    assert_eq!(stat.blocks, 2 * 1024 * 1024 / BLOCK_SIZE as u64);
    assert_eq!(stat.namelen, 255);
    assert!(stat.bfree < stat.blocks);
}

// ============================================================================
// Directories
// ============================================================================

#[tokio::test]
async fn rmdir_requires_empty_directory() {
    let fs = ramdisk(1);
    fs.mkdir(p("/d"), 0o040755).await.unwrap();
    fs.create(p("/d/one"), 0o100644).await.unwrap();
    fs.mkdir(p("/d/two"), 0o040755).await.unwrap();

    assert!(matches!(
        fs.rmdir(p("/d")).await,
        Err(VfsError::DirectoryNotEmpty(_))
    ));

    fs.unlink(p("/d/one")).await.unwrap();
    assert!(matches!(
        fs.rmdir(p("/d")).await,
        Err(VfsError::DirectoryNotEmpty(_))
    ));

    fs.rmdir(p("/d/two")).await.unwrap();
    fs.rmdir(p("/d")).await.unwrap();
    assert!(!fs.exists(p("/d")).await);
}

#[tokio::test]
async fn readdir_lists_in_creation_order() {
    let fs = ramdisk(1);
    fs.create(p("/x"), 0o100644).await.unwrap();
    fs.mkdir(p("/y"), 0o040755).await.unwrap();

    let names: Vec<_> = fs
        .readdir(p("/"))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [".", "..", "x", "y"]);

    // Listing is restartable: a second call yields the same sequence.
    let again: Vec<_> = fs
        .readdir(p("/"))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(again, names);

    assert!(matches!(
        fs.readdir(p("/missing")).await,
        Err(VfsError::NotFound(_))
    ));
}

// ============================================================================
// Rename
// ============================================================================

#[tokio::test]
async fn rename_overwrites_existing_file() {
    let fs = ramdisk(1);
    fs.write_all(p("/a.txt"), b"new content from a").await.unwrap();
    fs.write_all(p("/b.txt"), &pattern(3 * BLOCK_SIZE)).await.unwrap();
    let before = fs.usage();

    fs.rename(p("/a.txt"), p("/b.txt")).await.unwrap();

    assert!(matches!(
        fs.getattr(p("/a.txt")).await,
        Err(VfsError::NotFound(_))
    ));
    assert_eq!(
        fs.read_all(p("/b.txt")).await.unwrap(),
        b"new content from a"
    );
    // The old /b.txt node and its three chunks were released.
    assert_eq!(
        fs.usage().curr_size,
        before.curr_size - node_cost("/b.txt".len()) - 3 * CHUNK_COST
    );

    let names: Vec<_> = fs
        .readdir(p("/"))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, [".", "..", "b.txt"]);
}

#[tokio::test]
async fn rename_across_directories_updates_link_counts() {
    let fs = ramdisk(1);
    fs.mkdir(p("/src"), 0o040755).await.unwrap();
    fs.mkdir(p("/dst"), 0o040755).await.unwrap();
    fs.write_all(p("/src/f"), b"moving").await.unwrap();

    fs.rename(p("/src/f"), p("/dst/g")).await.unwrap();

    assert_eq!(fs.getattr(p("/src")).await.unwrap().nlink, 2);
    assert_eq!(fs.getattr(p("/dst")).await.unwrap().nlink, 3);
    assert_eq!(fs.read_all(p("/dst/g")).await.unwrap(), b"moving");
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_are_serialized() {
    let fs = Arc::new(ramdisk(4));
    let mut tasks = Vec::new();
    for worker in 0..8u8 {
        let fs = fs.clone();
        tasks.push(tokio::spawn(async move {
            let path = format!("/worker-{worker}");
            fs.create(Path::new(&path), 0o100644).await.unwrap();
            let mut offset = 0u64;
            for _ in 0..50 {
                let piece = [worker; 97];
                fs.write(Path::new(&path), offset, &piece).await.unwrap();
                offset += piece.len() as u64;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for worker in 0..8u8 {
        let data = fs
            .read_all(Path::new(&format!("/worker-{worker}")))
            .await
            .unwrap();
        assert_eq!(data.len(), 50 * 97);
        assert!(data.iter().all(|&b| b == worker));
    }
    let usage = fs.usage();
    assert!(usage.curr_size <= usage.max_size);
}
