use pbf_decoder::ReaderLimits;

/// Default bound of the queue between the reading and decoding stages.
pub const DEFAULT_QUEUE_CAPACITY: usize = 2500;

/// Configuration for a [`Pipeline`](crate::Pipeline).
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────────────┐
/// │ Field          │ Purpose                                          │
/// ├────────────────┼──────────────────────────────────────────────────┤
/// │ queue_capacity │ Blocks buffered between producer and consumers   │
/// │ consumers      │ Number of decoding contexts draining the queue   │
/// │ plain_nodes    │ Decode non-dense node groups instead of skipping │
/// │ limits         │ Header and blob size bounds for the frame reader │
/// └────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// A `queue_capacity` or `consumers` of zero is treated as one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    pub queue_capacity: usize,
    pub consumers: usize,
    pub plain_nodes: bool,
    pub limits: ReaderLimits,
}

impl Default for ParserConfig {
    /// A 2500-block queue, one consumer, dense nodes only, 64 KiB / 32 MiB
    /// reader limits.
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            consumers: 1,
            plain_nodes: false,
            limits: ReaderLimits::default(),
        }
    }
}
