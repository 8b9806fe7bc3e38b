use crate::proto;

/// A run of nodes stored column-wise with delta coding.
///
/// ```text
/// ┌──────────┬───────────┬───────────┬──────────────────────────────────┐
/// │ Field ID │ Wire Type │ Name      │ Description                      │
/// ├──────────┼───────────┼───────────┼──────────────────────────────────┤
/// │ 1        │ packed    │ id        │ sint64 deltas                    │
/// │ 5        │ Nested    │ denseinfo │ Metadata (skipped)               │
/// │ 8        │ packed    │ lat       │ sint64 deltas                    │
/// │ 9        │ packed    │ lon       │ sint64 deltas                    │
/// │ 10       │ packed    │ keys_vals │ int32 pairs, 0 ends each node    │
/// └──────────┴───────────┴───────────┴──────────────────────────────────┘
/// ```
///
/// The arrays are kept exactly as stored. Summing the deltas and walking
/// `keys_vals` is the decoder's job, which lets it report a length
/// mismatch instead of silently truncating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DenseNodes {
    pub ids: Vec<i64>,
    pub lats: Vec<i64>,
    pub lons: Vec<i64>,
    pub keys_vals: Vec<i32>,
}

impl DenseNodes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl From<proto::DenseNodes> for DenseNodes {
    fn from(msg: proto::DenseNodes) -> Self {
        Self {
            ids: msg.id,
            lats: msg.lat,
            lons: msg.lon,
            keys_vals: msg.keys_vals,
        }
    }
}

impl From<&DenseNodes> for proto::DenseNodes {
    fn from(dense: &DenseNodes) -> Self {
        Self {
            id: dense.ids.clone(),
            lat: dense.lats.clone(),
            lon: dense.lons.clone(),
            keys_vals: dense.keys_vals.clone(),
        }
    }
}
