use crate::{
    units::{Bytes, BytesPerMs, Millisecs},
    LINK_RATE,
};

/// A single bottleneck with a byte-granular FIFO, tail-drop and step ECN marking.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct Switch {
    #[builder(setter(into))]
    buffer: Bytes,
    #[builder(setter(into))]
    marking_threshold: Bytes,
    #[builder(default = LINK_RATE.into_bytes_per_ms(), setter(into))]
    rate: BytesPerMs,

    #[builder(default, setter(skip))]
    qsize: Bytes,
    #[builder(default, setter(skip))]
    served: Bytes,
}

impl Switch {
    /// A switch on the default link, sized in full packets.
    pub fn new(buffer_pkts: u64, ecn_thresh_pkts: u64) -> Self {
        Self::builder()
            .buffer(Bytes::packets(buffer_pkts))
            .marking_threshold(Bytes::packets(ecn_thresh_pkts))
            .build()
    }

    pub fn with_rate(buffer_pkts: u64, ecn_thresh_pkts: u64, rate: impl Into<BytesPerMs>) -> Self {
        Self::builder()
            .buffer(Bytes::packets(buffer_pkts))
            .marking_threshold(Bytes::packets(ecn_thresh_pkts))
            .rate(rate)
            .build()
    }

    pub fn buffer(&self) -> Bytes {
        self.buffer
    }

    pub fn marking_threshold(&self) -> Bytes {
        self.marking_threshold
    }

    pub fn rate(&self) -> BytesPerMs {
        self.rate
    }

    /// Current occupancy.
    pub fn queue(&self) -> Bytes {
        self.qsize
    }

    /// Bytes served since the switch was created.
    pub fn total_served(&self) -> Bytes {
        self.served
    }

    /// Admits all of `size` or none of it. A rejection is a loss.
    #[must_use]
    pub fn enqueue(&mut self, size: Bytes) -> bool {
        if self.qsize + size > self.buffer {
            return false;
        }
        self.qsize += size;
        true
    }

    /// Serves at most one step's worth of link capacity and returns the amount served.
    pub fn dequeue(&mut self, dt: Millisecs) -> Bytes {
        let served = self.qsize.min(self.rate.width(dt));
        self.qsize -= served;
        self.served += served;
        served
    }

    pub fn queue_delay(&self) -> Millisecs {
        if self.rate == BytesPerMs::ZERO {
            return Millisecs::ZERO;
        }
        Millisecs::new(self.qsize.frac(Bytes::new(self.rate.into_f64())))
    }

    /// 1.0 while occupancy is above the marking threshold, 0.0 otherwise.
    pub fn ecn_fraction(&self) -> f64 {
        if self.qsize > self.marking_threshold {
            1.0
        } else {
            0.0
        }
    }
}
