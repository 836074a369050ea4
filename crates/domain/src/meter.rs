use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const DEFAULT_METER: &str = "teental";

/// A taal: a cycle of `cycle_length` beats with accented (sam) and empty (khali) positions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meter {
    pub id: String,
    #[serde(alias = "beats")]
    pub cycle_length: u32,
    #[serde(default, alias = "sam")]
    pub accented: BTreeSet<u32>,
    #[serde(default, alias = "khali")]
    pub empty: BTreeSet<u32>,
}

impl Meter {
    pub fn new(
        id: impl Into<String>,
        cycle_length: u32,
        accented: impl IntoIterator<Item = u32>,
        empty: impl IntoIterator<Item = u32>,
    ) -> Result<Self, DomainError> {
        let meter = Self {
            id: id.into(),
            cycle_length,
            accented: accented.into_iter().collect(),
            empty: empty.into_iter().collect(),
        };
        meter.validate()?;
        Ok(meter)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("meter id cannot be empty"));
        }
        if self.cycle_length == 0 {
            return Err(DomainError::validation(format!(
                "meter {} must have at least one beat",
                self.id
            )));
        }
        let out_of_range = self
            .accented
            .iter()
            .chain(self.empty.iter())
            .find(|&&beat| beat >= self.cycle_length);
        if let Some(beat) = out_of_range {
            return Err(DomainError::validation(format!(
                "beat {} is outside the {}-beat cycle of {}",
                beat, self.cycle_length, self.id
            )));
        }
        Ok(())
    }

    pub fn is_accented(&self, beat: u32) -> bool {
        self.accented.contains(&beat)
    }

    pub fn is_empty_beat(&self, beat: u32) -> bool {
        self.empty.contains(&beat)
    }

    /// Per-beat marks used to lay out the beat circle.
    pub fn layout(&self) -> Vec<BeatMark> {
        (0..self.cycle_length)
            .map(|index| BeatMark {
                index,
                accented: self.is_accented(index),
                empty: self.is_empty_beat(index),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeatMark {
    pub index: u32,
    pub accented: bool,
    pub empty: bool,
}

/// Read-only registry of meters, fixed once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeterTable {
    meters: BTreeMap<String, Meter>,
}

impl MeterTable {
    pub fn builtin() -> Self {
        let definitions: [(&str, u32, &[u32], &[u32]); 5] = [
            ("teental", 16, &[0], &[8]),
            ("rupak", 7, &[0], &[0, 3]),
            ("jhaptal", 10, &[0], &[5]),
            ("dadra", 6, &[0], &[3]),
            ("keherwa", 8, &[0], &[4]),
        ];
        let meters = definitions
            .iter()
            .map(|(id, beats, sam, khali)| {
                let meter = Meter {
                    id: (*id).to_string(),
                    cycle_length: *beats,
                    accented: sam.iter().copied().collect(),
                    empty: khali.iter().copied().collect(),
                };
                (meter.id.clone(), meter)
            })
            .collect();
        Self { meters }
    }

    pub fn from_definitions(definitions: Vec<Meter>) -> Result<Self, DomainError> {
        if definitions.is_empty() {
            return Err(DomainError::validation(
                "meter table requires at least one meter",
            ));
        }
        let mut meters = BTreeMap::new();
        for meter in definitions {
            meter.validate()?;
            if meters.contains_key(&meter.id) {
                return Err(DomainError::validation(format!(
                    "duplicate meter id {}",
                    meter.id
                )));
            }
            meters.insert(meter.id.clone(), meter);
        }
        Ok(Self { meters })
    }

    pub fn from_yaml(source: &str) -> Result<Self, DomainError> {
        let definitions: Vec<Meter> = serde_yaml::from_str(source)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        Self::from_definitions(definitions)
    }

    pub fn meter(&self, id: &str) -> Result<&Meter, DomainError> {
        self.meters
            .get(id)
            .ok_or_else(|| DomainError::UnknownMeter(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.meters.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.meters.keys().map(String::as_str)
    }

    pub fn meters(&self) -> impl Iterator<Item = &Meter> {
        self.meters.values()
    }
}

impl Default for MeterTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_teental() {
        let table = MeterTable::builtin();
        let teental = table.meter("teental").unwrap();
        assert_eq!(teental.cycle_length, 16);
        assert!(teental.is_accented(0));
        assert!(teental.is_empty_beat(8));
        assert!(!teental.is_empty_beat(0));
    }

    #[test]
    fn builtin_meters_are_valid() {
        let table = MeterTable::builtin();
        assert_eq!(table.ids().count(), 5);
        for meter in table.meters() {
            assert!(meter.validate().is_ok(), "{} invalid", meter.id);
        }
    }

    #[test]
    fn unknown_meter_is_rejected() {
        let table = MeterTable::builtin();
        let err = table.meter("ektaal").unwrap_err();
        assert!(matches!(err, DomainError::UnknownMeter(id) if id == "ektaal"));
    }

    #[test]
    fn meter_validation() {
        assert!(Meter::new("empty", 0, [], []).is_err());
        assert!(Meter::new("wide", 4, [0], [4]).is_err());
        assert!(Meter::new("", 4, [0], []).is_err());
        assert!(Meter::new("ok", 4, [0], [2]).is_ok());
    }

    #[test]
    fn rupak_layout_marks_sam_and_khali_together() {
        let table = MeterTable::builtin();
        let layout = table.meter("rupak").unwrap().layout();
        assert_eq!(layout.len(), 7);
        assert!(layout[0].accented && layout[0].empty);
        assert!(layout[3].empty && !layout[3].accented);
    }

    #[test]
    fn yaml_definitions_accept_source_field_names() {
        let yaml = "- id: ektaal\n  beats: 12\n  sam: [0]\n  khali: [2, 6]\n";
        let table = MeterTable::from_yaml(yaml).unwrap();
        let ektaal = table.meter("ektaal").unwrap();
        assert_eq!(ektaal.cycle_length, 12);
        assert!(ektaal.is_empty_beat(6));
        assert!(!table.contains("teental"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let meter = Meter::new("dadra", 6, [0], [3]).unwrap();
        assert!(MeterTable::from_definitions(vec![meter.clone(), meter]).is_err());
    }
}
