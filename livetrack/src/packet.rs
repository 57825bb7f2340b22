//! JSON payloads produced each cycle
//!
//! Two shapes exist: the live packet written to the JSONL log, and the flat
//! per-person list sent to the renderer (Unity/Blender style receivers).

use crate::types::WorldPosition;
use serde::{Deserialize, Serialize};

/// One person in the live packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub id: u32,
    /// Rounded to millimetres
    pub pos: [f64; 2],
    /// Rounded to a tenth of a degree
    pub dir_deg: f64,
    pub conf: f64,
}

/// Per-cycle packet: wall-clock time and everyone seen this cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePacket {
    /// Local time, "HH:MM:SS"
    pub ts: String,
    pub people: Vec<PersonEntry>,
}

/// Receiver-side entry; the ground plane is z = 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverEntry {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Heading in degrees
    pub r: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Tenth-degree heading that stays within [0, 360) after rounding
fn round_heading(heading: f64) -> f64 {
    let rounded = round_to(heading, 1);
    if rounded >= 360.0 {
        rounded - 360.0
    } else {
        rounded
    }
}

/// Current local time formatted for packets
pub fn timestamp_string() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub fn format_live_packet(positions: &[WorldPosition], ts: &str) -> LivePacket {
    let people = positions
        .iter()
        .map(|p| PersonEntry {
            id: p.id,
            pos: [round_to(p.x, 3), round_to(p.y, 3)],
            dir_deg: round_heading(p.heading),
            conf: round_to(f64::from(p.confidence), 2),
        })
        .collect();

    LivePacket {
        ts: ts.to_string(),
        people,
    }
}

pub fn format_for_receiver(packet: &LivePacket) -> Vec<ReceiverEntry> {
    packet
        .people
        .iter()
        .map(|p| ReceiverEntry {
            id: p.id.to_string(),
            x: p.pos[0],
            y: p.pos[1],
            z: 0.0,
            r: p.dir_deg,
        })
        .collect()
}
