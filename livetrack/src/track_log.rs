//! JSON-lines log of live packets

use crate::error::Result;
use crate::packet::LivePacket;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one packet per line. The file is truncated when opened.
pub struct TrackLog {
    writer: BufWriter<File>,
    path: PathBuf,
    lines: u64,
}

impl TrackLog {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        log::info!("Logging tracks to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    /// Append one packet and push the line to the file
    pub fn write_packet(&mut self, packet: &LivePacket) -> Result<()> {
        serde_json::to_writer(&mut self.writer, packet)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for TrackLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PersonEntry;

    #[test]
    fn test_one_line_per_packet_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.jsonl");
        std::fs::write(&path, "stale content from a previous run\n").unwrap();

        {
            let mut log = TrackLog::create(&path).unwrap();
            let packet = LivePacket {
                ts: "10:00:00".to_string(),
                people: vec![PersonEntry {
                    id: 1,
                    pos: [0.5, 1.25],
                    dir_deg: 90.0,
                    conf: 0.9,
                }],
            };
            log.write_packet(&packet).unwrap();
            log.write_packet(&LivePacket {
                ts: "10:00:01".to_string(),
                people: Vec::new(),
            })
            .unwrap();
            assert_eq!(log.lines_written(), 2);
        }

        let text = std::fs::read_to_string(&path).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"ts":"10:00:00","people":[{"id":1,"pos":[0.5,1.25],"dir_deg":90.0,"conf":0.9}]}"#
        );
        assert_eq!(lines[1], r#"{"ts":"10:00:01","people":[]}"#);
    }
}
