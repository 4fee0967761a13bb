//! # Network Simulation
//!
//! Deterministic lossy links and a two-endpoint soak harness.
//!
//! ## Design
//!
//! ```text
//!   ┌───────────┐  LossyLink (a -> b)  ┌───────────┐
//!   │ endpoint a│ ───── drop/dup/delay ▶│ endpoint b│
//!   │           │ ◀──── drop/dup/delay ─│           │
//!   └───────────┘  LossyLink (b -> a)  └───────────┘
//! ```
//!
//! Every random decision comes from a seeded `ChaCha8Rng`, so a failing
//! soak run can be replayed exactly from its seed.
//!
//! The harness checks two properties on every tick:
//! - every sequence an endpoint reports as acked was really delivered
//! - every delivered datagram decodes to exactly the packet that was sent

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ProtocolConfig;
use crate::endpoint::{AckEndpoint, EndpointCounters};
use crate::error::ProtocolResult;
use crate::packets::{Packet, PacketCodec};
use crate::sliding_window::SlidingWindow;

/// Network impairment settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
    /// Out-of-order percentage (0-100).
    pub out_of_order_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        packet_loss_percent: 0,
        duplicate_percent: 0,
        out_of_order_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        packet_loss_percent: 1,
        duplicate_percent: 0,
        out_of_order_percent: 1,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        packet_loss_percent: 5,
        duplicate_percent: 1,
        out_of_order_percent: 2,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        packet_loss_percent: 20,
        duplicate_percent: 5,
        out_of_order_percent: 10,
    };

    /// Looks up a preset by name, case-insensitively.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "perfect" => Some(Self::PERFECT),
            "good" => Some(Self::GOOD),
            "average" => Some(Self::AVERAGE),
            "poor" => Some(Self::POOR),
            _ => None,
        }
    }

    /// Returns true if a packet should be dropped.
    #[inline]
    #[must_use]
    pub const fn should_drop(&self, roll: u32) -> bool {
        roll % 100 < self.packet_loss_percent as u32
    }

    /// Returns true if a packet should be delivered twice.
    #[inline]
    #[must_use]
    pub const fn should_duplicate(&self, roll: u32) -> bool {
        roll % 100 < self.duplicate_percent as u32
    }

    /// Returns true if a packet should arrive after the one sent next.
    #[inline]
    #[must_use]
    pub const fn should_reorder(&self, roll: u32) -> bool {
        roll % 100 < self.out_of_order_percent as u32
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// What a link did to the traffic sent through it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Datagrams handed to the link.
    pub sent: u64,
    /// Datagrams lost.
    pub dropped: u64,
    /// Extra copies injected.
    pub duplicated: u64,
    /// Datagrams delayed behind their successor.
    pub reordered: u64,
    /// Datagrams handed to the receiver.
    pub delivered: u64,
}

/// One-way, in-memory link that loses, duplicates and reorders datagrams.
#[derive(Clone, Debug)]
pub struct LossyLink {
    conditions: NetworkConditions,
    rng: ChaCha8Rng,
    in_flight: VecDeque<Vec<u8>>,
    /// Datagrams held back until after the next send.
    held: Vec<Vec<u8>>,
    stats: LinkStats,
}

impl LossyLink {
    /// Creates a link whose impairments are fully determined by `seed`.
    #[must_use]
    pub fn new(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: ChaCha8Rng::seed_from_u64(seed),
            in_flight: VecDeque::new(),
            held: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    /// Hands a datagram to the link.
    ///
    /// A reordered datagram is held back and released behind the datagram
    /// of the following `send`.
    pub fn send(&mut self, data: &[u8]) {
        self.stats.sent += 1;
        let held = std::mem::take(&mut self.held);

        if self.conditions.should_drop(self.rng.gen()) {
            self.stats.dropped += 1;
        } else {
            let copies = if self.conditions.should_duplicate(self.rng.gen()) {
                self.stats.duplicated += 1;
                2
            } else {
                1
            };
            for _ in 0..copies {
                if self.conditions.should_reorder(self.rng.gen()) {
                    self.stats.reordered += 1;
                    self.held.push(data.to_vec());
                } else {
                    self.in_flight.push_back(data.to_vec());
                }
            }
        }

        self.in_flight.extend(held);
    }

    /// Takes the next datagram to arrive, if any.
    pub fn receive(&mut self) -> Option<Vec<u8>> {
        let data = self.in_flight.pop_front()?;
        self.stats.delivered += 1;
        Some(data)
    }

    /// Datagrams queued or held back but not yet received.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len() + self.held.len()
    }

    /// Traffic statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &LinkStats {
        &self.stats
    }
}

/// Soak run settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoakConfig {
    /// Number of ticks; each endpoint sends one datagram per tick.
    pub iterations: u32,
    /// Impairments applied in both directions.
    pub conditions: NetworkConditions,
    /// Seed for both links.
    pub seed: u64,
    /// Protocol settings shared by both endpoints.
    pub protocol: ProtocolConfig,
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            conditions: NetworkConditions::AVERAGE,
            seed: 0x5EED,
            protocol: ProtocolConfig::default(),
        }
    }
}

/// Outcome of a soak run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoakReport {
    /// Ticks completed.
    pub iterations: u32,
    /// Counters of the first endpoint.
    pub a: EndpointCounters,
    /// Counters of the second endpoint.
    pub b: EndpointCounters,
    /// Link from the first endpoint to the second.
    pub link_ab: LinkStats,
    /// Link from the second endpoint to the first.
    pub link_ba: LinkStats,
    /// Acks for packets the peer never received.
    pub false_acks: u64,
    /// Delivered datagrams that decoded to something other than what was sent.
    pub payload_mismatches: u64,
}

impl SoakReport {
    /// Returns true if no invariant was violated.
    #[inline]
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.false_acks == 0 && self.payload_mismatches == 0
    }
}

/// Sequences of sent packets and deliveries the harness remembers.
const HISTORY: usize = 1024;

/// Sending half of one side of the soak.
#[derive(Debug)]
struct Peer {
    endpoint: AckEndpoint,
    codec: PacketCodec,
    /// Packet bodies by sequence, for checking what the other side decodes.
    sent: SlidingWindow<Packet>,
    /// Sequences the other side actually received from us.
    delivered: SlidingWindow<()>,
}

impl Peer {
    fn new(config: &ProtocolConfig) -> ProtocolResult<Self> {
        Ok(Self {
            endpoint: AckEndpoint::new(config)?,
            codec: PacketCodec::new(config),
            sent: SlidingWindow::new(HISTORY)?,
            delivered: SlidingWindow::new(HISTORY)?,
        })
    }
}

/// Two endpoints exchanging datagrams over lossy links.
#[derive(Debug)]
pub struct SoakHarness {
    config: SoakConfig,
    a: Peer,
    b: Peer,
    link_ab: LossyLink,
    link_ba: LossyLink,
    report: SoakReport,
}

impl SoakHarness {
    /// Creates a harness.
    ///
    /// # Errors
    ///
    /// Configuration errors from the endpoints.
    pub fn new(config: SoakConfig) -> ProtocolResult<Self> {
        config.protocol.validate()?;
        Ok(Self {
            a: Peer::new(&config.protocol)?,
            b: Peer::new(&config.protocol)?,
            link_ab: LossyLink::new(config.conditions, config.seed),
            link_ba: LossyLink::new(config.conditions, config.seed.rotate_left(32) ^ 1),
            report: SoakReport::default(),
            config,
        })
    }

    /// Runs every configured iteration and returns the report.
    ///
    /// # Errors
    ///
    /// Any encode or decode failure. The link never corrupts bytes, so a
    /// failure here is a codec bug.
    pub fn run(mut self) -> ProtocolResult<SoakReport> {
        tracing::info!(
            iterations = self.config.iterations,
            seed = self.config.seed,
            loss = self.config.conditions.packet_loss_percent,
            "soak started"
        );

        for iteration in 0..self.config.iterations {
            self.tick(iteration)?;
            if iteration > 0 && iteration % 1000 == 0 {
                tracing::debug!(
                    iteration,
                    acked_a = self.a.endpoint.counters().packets_acked,
                    acked_b = self.b.endpoint.counters().packets_acked,
                    "soak progress"
                );
            }
        }

        let report = self.report();
        if report.passed() {
            tracing::info!(?report, "soak finished");
        } else {
            tracing::warn!(?report, "soak found violations");
        }
        Ok(report)
    }

    /// Runs one tick: both sides send, then both sides drain their inbound
    /// link.
    ///
    /// # Errors
    ///
    /// Any encode or decode failure.
    pub fn tick(&mut self, iteration: u32) -> ProtocolResult<()> {
        send(&mut self.a, &mut self.link_ab, iteration)?;
        send(&mut self.b, &mut self.link_ba, iteration.wrapping_mul(7))?;

        self.report.payload_mismatches += receive(&mut self.b, &mut self.a, &mut self.link_ab)?;
        self.report.payload_mismatches += receive(&mut self.a, &mut self.b, &mut self.link_ba)?;

        self.report.false_acks += check_acks(&mut self.a);
        self.report.false_acks += check_acks(&mut self.b);

        self.report.iterations = iteration + 1;
        Ok(())
    }

    /// Snapshot of the report so far.
    #[must_use]
    pub fn report(&self) -> SoakReport {
        SoakReport {
            a: *self.a.endpoint.counters(),
            b: *self.b.endpoint.counters(),
            link_ab: *self.link_ab.stats(),
            link_ba: *self.link_ba.stats(),
            ..self.report
        }
    }
}

fn send(peer: &mut Peer, link: &mut LossyLink, iteration: u32) -> ProtocolResult<()> {
    let header = peer.endpoint.write_header();
    let packet = match iteration % 16 {
        0 => Packet::Connect {
            a: (iteration % 21) as i32 - 10,
            b: 10,
            c: -10,
        },
        15 => Packet::Disconnect {
            x: (iteration % 201) as i32 - 100,
        },
        n if n % 4 == 0 => Packet::Connection,
        _ => Packet::Update {
            timestamp: iteration as u16,
        },
    };

    peer.sent.insert(header.sequence, packet);
    let data = peer.codec.write(header, packet)?;
    link.send(data);
    Ok(())
}

/// Drains `link` into `receiver`, returning the number of payload
/// mismatches against what `sender` recorded.
fn receive(receiver: &mut Peer, sender: &mut Peer, link: &mut LossyLink) -> ProtocolResult<u64> {
    let mut mismatches = 0;
    while let Some(data) = link.receive() {
        let (header, packet) = receiver.codec.read(&data)?;

        if sender.sent.find(header.sequence) != Some(&packet) {
            tracing::warn!(sequence = header.sequence, ?packet, "payload mismatch");
            mismatches += 1;
        }

        if receiver.endpoint.read_header(&header) {
            sender.delivered.insert(header.sequence, ());
        }
    }
    Ok(mismatches)
}

/// Counts acks reported by `peer` for packets the other side never
/// received.
fn check_acks(peer: &mut Peer) -> u64 {
    let delivered = &peer.delivered;
    peer.endpoint
        .drain_acks()
        .filter(|&sequence| {
            let real = delivered.contains(sequence);
            if !real {
                tracing::warn!(sequence, "false ack");
            }
            !real
        })
        .count() as u64
}
