//! Size-bounded partitioning of a submission into transport-sized groups.

use tracing::debug;

/// Default per-batch ceiling: 45 MiB, leaving margin under the 50 MiB
/// document-upload hard limit.
pub const DEFAULT_BATCH_CEILING: u64 = 45 * 1024 * 1024;

/// One uploaded photo as received from the caller, before any processing.
#[derive(Debug, Clone)]
pub struct RawPhoto {
    pub original_name: Option<String>,
    pub data: Vec<u8>,
}

impl RawPhoto {
    pub fn new(original_name: Option<String>, data: Vec<u8>) -> Self {
        Self {
            original_name,
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Extension of the original file name, lower-cased, if any.
    pub fn extension(&self) -> Option<String> {
        self.original_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// An ordered group of photos destined for one transport call.
#[derive(Debug, Default)]
pub struct Batch {
    pub photos: Vec<RawPhoto>,
    pub total_bytes: u64,
}

impl Batch {
    fn push(&mut self, photo: RawPhoto) {
        self.total_bytes += photo.size();
        self.photos.push(photo);
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Partition `photos` in input order into batches whose cumulative size stays
/// within `max_bytes`. A photo larger than the ceiling on its own is never
/// split or dropped: it flushes the current batch and becomes a singleton.
/// Order is preserved within and across batches; empty input yields no
/// batches.
pub fn chunk(photos: Vec<RawPhoto>, max_bytes: u64) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::default();

    for photo in photos {
        let size = photo.size();
        if size > max_bytes {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            debug!(bytes = size, ceiling = max_bytes, "oversized photo emitted as singleton batch");
            let mut single = Batch::default();
            single.push(photo);
            batches.push(single);
            continue;
        }
        if current.total_bytes + size > max_bytes && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
        }
        current.push(photo);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
