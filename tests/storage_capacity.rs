use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use scorebook::{
    core::store::{Scorebook, StoreConfig, StoreError},
    logo::{LogoCompressor, LogoError, to_data_url},
    model::{Shooter, Team},
    persist::{MemorySlot, Slot, SlotError, SlotResult},
};

/// Returns a fixed replacement and counts calls.
struct FixedCompressor {
    output: String,
    calls: Arc<AtomicUsize>,
}

impl FixedCompressor {
    fn new(output: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                output: output.to_string(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl LogoCompressor for FixedCompressor {
    fn compress(&self, _data_url: &str) -> Result<String, LogoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Memory slot that records the size of every attempted write.
struct RecordingSlot {
    inner: MemorySlot,
    attempts: Arc<Mutex<Vec<usize>>>,
}

impl Slot for RecordingSlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        self.inner.read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        self.attempts.lock().expect("lock").push(value.len());
        self.inner.write(key, value)
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        self.inner.remove(key)
    }
}

const SMALL_LOGO: &str = "data:image/jpeg;base64,AAAA";

#[test]
fn large_document_compresses_logo_before_writing() {
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let inner = MemorySlot::new();
    let slot = RecordingSlot {
        inner: inner.clone(),
        attempts: Arc::clone(&attempts),
    };
    let (compressor, calls) = FixedCompressor::new(SMALL_LOGO);
    let mut store = Scorebook::open(Box::new(slot), StoreConfig::default())
        .with_compressor(Arc::new(compressor));

    let original = to_data_url(&vec![0u8; 4 * 1024 * 1024], "image/png");
    assert!(original.len() > 5_000_000);
    store.save_logo(&original).expect("save logo");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.logo(), Some(SMALL_LOGO));
    assert!(store.logo().unwrap().len() <= original.len());
    let attempts = attempts.lock().expect("lock");
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0] < 5_000_000);

    let stored = inner.read(&store.config().slot_key).unwrap().unwrap();
    assert!(stored.contains(SMALL_LOGO));
}

#[test]
fn quota_failure_compresses_and_retries_once() {
    let slot = MemorySlot::with_quota(4_000);
    let (compressor, calls) = FixedCompressor::new(SMALL_LOGO);
    let mut store = Scorebook::open(Box::new(slot.clone()), StoreConfig::default())
        .with_compressor(Arc::new(compressor));

    let logo = to_data_url(&vec![1u8; 6_000], "image/png");
    store.save_logo(&logo).expect("retry succeeds");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.logo(), Some(SMALL_LOGO));
    assert_eq!(slot.write_count(), 1);
}

#[test]
fn storage_full_keeps_memory_state_and_previous_copy() {
    let slot = MemorySlot::with_quota(500);
    let mut store = Scorebook::open(Box::new(slot.clone()), StoreConfig::default());
    store.add_standalone_shooter(Shooter::new("Erste")).expect("fits");
    let key = store.config().slot_key.clone();
    let before = slot.read(&key).unwrap();

    let roster: Vec<Shooter> = (0..4).map(|i| Shooter::new(format!("Schütze Nummer {i} mit Namen"))).collect();
    let err = store.add_team(Team::new("Eine Mannschaft mit langem Namen", roster)).unwrap_err();

    assert!(matches!(err, StoreError::StorageFull(SlotError::QuotaExceeded { .. })));
    assert!(!err.to_string().is_empty());
    assert_eq!(store.teams().len(), 1);
    assert_eq!(slot.read(&key).unwrap(), before);
}

#[test]
fn compressed_logo_kept_only_when_smaller() {
    let slot = MemorySlot::new();
    let logo = to_data_url(&[1, 2, 3], "image/png");
    let bigger = format!("{logo}AAAAAAAA");
    let (compressor, calls) = FixedCompressor::new(&bigger);
    let mut store = Scorebook::open(Box::new(slot), StoreConfig::default())
        .with_compressor(Arc::new(compressor));

    store.save_logo(&logo).unwrap();
    assert!(!store.compress_logo());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.logo(), Some(logo.as_str()));
}

#[test]
fn logo_over_five_megabytes_is_rejected_up_front() {
    let slot = MemorySlot::new();
    let mut store = Scorebook::open(Box::new(slot.clone()), StoreConfig::default());

    let err = store
        .save_logo_bytes(&vec![0u8; 5 * 1024 * 1024 + 1], "image/png")
        .unwrap_err();
    assert!(matches!(err, StoreError::LogoTooLarge { .. }));
    assert_eq!(store.logo(), None);
    assert_eq!(slot.write_count(), 0);

    assert!(matches!(store.save_logo("not-a-data-url"), Err(StoreError::Logo(_))));
}

#[test]
fn stale_compression_result_is_dropped() {
    let slot = MemorySlot::new();
    let mut store = Scorebook::open(Box::new(slot), StoreConfig::default());
    let first = to_data_url(&[1; 64], "image/png");
    let second = to_data_url(&[2; 64], "image/png");
    store.save_logo(&first).unwrap();
    store.save_logo(&second).unwrap();

    assert!(!store.apply_compressed_logo(&first, SMALL_LOGO.to_string()).unwrap());
    assert_eq!(store.logo(), Some(second.as_str()));

    assert!(store.apply_compressed_logo(&second, SMALL_LOGO.to_string()).unwrap());
    assert_eq!(store.logo(), Some(SMALL_LOGO));

    assert!(store.delete_logo().unwrap());
    assert!(!store.delete_logo().unwrap());
}
