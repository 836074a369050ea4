use lehra_domain::{BeatMark, VisualEvent};
use lehra_engine::VisualSink;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Prints visual events to stdout, one line each.
pub struct ConsoleSink {
    format: Format,
    layout: Vec<BeatMark>,
}

impl ConsoleSink {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            layout: Vec::new(),
        }
    }

    fn render_text(&mut self, event: &VisualEvent) -> Option<String> {
        match event {
            VisualEvent::Layout { meter_id, beats } => {
                self.layout = beats.clone();
                let marks: Vec<&str> = beats.iter().map(mark).collect();
                Some(format!("Taal {}: {}", meter_id, marks.join(" ")))
            }
            VisualEvent::BeatChanged { index } => {
                let symbol = self.layout.get(*index as usize).map_or(".", mark);
                Some(format!("matra {:>2} {}", index + 1, symbol))
            }
            VisualEvent::CycleBoundary => None,
            VisualEvent::Reset => Some("Stopped (matra 1)".to_string()),
            VisualEvent::Asset(status) => Some(status.to_string()),
            VisualEvent::Practice(status) => {
                let text = status.to_string();
                (!text.is_empty()).then_some(text)
            }
            VisualEvent::Tempo { bpm, band } => Some(format!("Tempo {:.0} BPM ({})", bpm, band)),
            VisualEvent::Key { semitones, name } => Some(format!("Key {} ({:+})", name, semitones)),
            VisualEvent::Flash { active: true } => Some("*** tempo up ***".to_string()),
            VisualEvent::Flash { active: false } => None,
            VisualEvent::Fault { message } => Some(format!("Error: {}", message)),
        }
    }

    pub fn render(&mut self, event: &VisualEvent) -> Option<String> {
        match self.format {
            Format::Text => self.render_text(event),
            Format::Json => match event.to_json_line() {
                Ok(line) => Some(line),
                Err(err) => {
                    warn!(%err, "could not encode visual event");
                    None
                }
            },
        }
    }
}

fn mark(beat: &BeatMark) -> &'static str {
    if beat.accented {
        "X"
    } else if beat.empty {
        "0"
    } else {
        "."
    }
}

impl VisualSink for ConsoleSink {
    fn emit(&mut self, event: VisualEvent) {
        if let Some(line) = self.render(&event) {
            println!("{}", line);
        }
    }
}
