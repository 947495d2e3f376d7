// Text readouts for the status panels and the console monitor

use crate::motion::{AttitudeFrame, HeadingFrame};
use crate::types::{ConnectionStatus, DataStatus, Snapshot};
use std::fmt::Write;

/// Stream uptime as `1h2m`, `3m4s` or `5s`
pub fn format_uptime(uptime_sec: f64) -> String {
    let total = uptime_sec.max(0.0).floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{}h{}m", h, m)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// GPS fix type label
pub fn fix_label(fix: u8) -> &'static str {
    match fix {
        3 => "3D",
        f if f >= 2 => "2D",
        _ => "No Fix",
    }
}

/// One-line console summary of the current instrument state
pub fn summary_line(
    connection: ConnectionStatus,
    data: DataStatus,
    attitude: Option<&AttitudeFrame>,
    heading: Option<&HeadingFrame>,
    latest: Option<&Snapshot>,
) -> String {
    let mut line = format!("[{}] [{}]", connection, data);

    if let Some(frame) = attitude {
        let _ = write!(line, " pitch={} roll={}", frame.pitch_text, frame.roll_text);
    }
    if let Some(frame) = heading {
        let _ = write!(line, " hdg={}", frame.readout_text);
    }

    if let Some(snapshot) = latest {
        if let Some(gps) = snapshot.gps {
            let _ = write!(line, " gps={} sats={}", fix_label(gps.fix), gps.sats);
        }
        if let Some(status) = snapshot.status {
            let _ = write!(line, " vbat={:.1}V", status.vbat);
        }
        if let Some(stats) = snapshot.stats {
            let _ = write!(line, " up={} fps={:.0}", format_uptime(stats.uptime_sec), stats.fps);
        }
    }

    line
}
