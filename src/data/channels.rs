use crate::data::custom_names::CustomNames;
use crate::data::loader::{ColumnKind, LogTable};
use crate::error::{HistoError, Result};
use crate::processing::derived::PidKind;
use crate::state::request::YAxisSource;

/// Column indices of the channels the pipelines treat specially.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMap {
    pub rpm: usize,
    pub pressure_ratio: Option<usize>,
    pub map: Option<usize>,
    pub baro: Option<usize>,
    pub coolant: Option<usize>,
    pub pulse_width: Option<usize>,
    /// Bank 1 and bank 2 long-term fuel trim.
    pub long_term_trims: Option<(usize, usize)>,
    pub short_term_trims: Option<(usize, usize)>,
}

#[derive(Clone, Copy)]
enum Role {
    Rpm,
    PressureRatio,
    Map,
    Baro,
    Coolant,
    PulseWidth,
    LongTerm1,
    LongTerm2,
    ShortTerm1,
    ShortTerm2,
}

/// Upper-cased column names recognised for each role.
const NAME_TABLE: &[(&str, Role)] = &[
    ("RPM", Role::Rpm),
    ("ENGINE SPEED", Role::Rpm),
    ("PRATIO", Role::PressureRatio),
    ("P-RATIO MAP/BARO", Role::PressureRatio),
    ("AVG MAP TO USE", Role::Map),
    ("BARO", Role::Baro),
    ("ECT", Role::Coolant),
    ("ENGINE COOLANT TEMP", Role::Coolant),
    ("ENGINE COOLANT TEMPERATURE", Role::Coolant),
    ("AVG TOTAL WORKING PW", Role::PulseWidth),
    ("1/1 LONG TERM ADAP", Role::LongTerm1),
    ("2/1 LONG TERM ADAP", Role::LongTerm2),
    ("1/1 SHORT TERM ADAP", Role::ShortTerm1),
    ("2/1 SHORT TERM ADAP", Role::ShortTerm2),
];

impl ChannelMap {
    /// Match column names against the role table. The first column found
    /// for a role wins. Fails when no RPM column exists.
    pub fn identify(table: &LogTable) -> Result<Self> {
        let mut rpm = None;
        let mut map = ChannelMap::default();
        let (mut lt1, mut lt2, mut st1, mut st2) = (None, None, None, None);

        for (idx, column) in table.columns.iter().enumerate() {
            if column.kind != ColumnKind::Numeric {
                continue;
            }
            let upper = column.name.trim().to_uppercase();
            let Some(&(_, role)) = NAME_TABLE.iter().find(|(name, _)| *name == upper) else {
                continue;
            };
            let slot = match role {
                Role::Rpm => &mut rpm,
                Role::PressureRatio => &mut map.pressure_ratio,
                Role::Map => &mut map.map,
                Role::Baro => &mut map.baro,
                Role::Coolant => &mut map.coolant,
                Role::PulseWidth => &mut map.pulse_width,
                Role::LongTerm1 => &mut lt1,
                Role::LongTerm2 => &mut lt2,
                Role::ShortTerm1 => &mut st1,
                Role::ShortTerm2 => &mut st2,
            };
            slot.get_or_insert(idx);
        }

        map.rpm = rpm.ok_or(HistoError::MissingRequiredChannel)?;
        map.long_term_trims = lt1.zip(lt2);
        map.short_term_trims = st1.zip(st2);
        tracing::debug!("Identified channels: {map:?}");
        Ok(map)
    }

    /// Y-axis used when the user has not picked one: the logged pressure
    /// ratio, else MAP over baro.
    pub fn default_y_axis(&self) -> Result<YAxisSource> {
        if let Some(col) = self.pressure_ratio {
            return Ok(YAxisSource::PressureRatio(col));
        }
        match (self.map, self.baro) {
            (Some(map), Some(baro)) => Ok(YAxisSource::MapOverBaro { map, baro }),
            _ => Err(HistoError::MissingRatioChannel),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PidInfo {
    pub kind: PidKind,
    pub name: String,
    pub unit: String,
    pub custom_name: Option<String>,
}

impl PidInfo {
    /// Custom alias when one is set, else the logged name.
    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.name)
    }
}

/// Every channel a user can pick: usable raw columns plus the derived
/// channels whose sources are present, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct PidCatalog {
    pids: Vec<PidInfo>,
}

impl PidCatalog {
    pub fn build(table: &LogTable, channels: &ChannelMap, custom: Option<&CustomNames>) -> Self {
        let unit_of = |idx: usize| -> String {
            let column = &table.columns[idx];
            column.unit.clone().unwrap_or_else(|| infer_unit(&column.name))
        };

        let mut pids: Vec<PidInfo> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Numeric && is_pid_name(&c.name))
            .map(|(idx, c)| PidInfo {
                kind: PidKind::Column(idx),
                name: c.name.clone(),
                unit: unit_of(idx),
                custom_name: None,
            })
            .collect();

        let derived = [
            (PidKind::InjectorDutyCycle, Some("%".to_string())),
            (PidKind::Boost, channels.baro.map(unit_of)),
            (PidKind::LtFuelAverage, channels.long_term_trims.map(|(a, _)| unit_of(a))),
            (PidKind::StFuelAverage, channels.short_term_trims.map(|(a, _)| unit_of(a))),
        ];
        for (kind, unit) in derived {
            if !kind.is_available(channels) {
                continue;
            }
            if let Some(name) = kind.derived_name() {
                pids.push(PidInfo {
                    kind,
                    name: name.to_string(),
                    unit: unit.unwrap_or_default(),
                    custom_name: None,
                });
            }
        }

        pids.sort_by_key(|p| p.name.to_lowercase());

        let mut catalog = PidCatalog { pids };
        if let Some(names) = custom {
            catalog.apply_custom_names(names);
        }
        catalog
    }

    pub fn apply_custom_names(&mut self, names: &CustomNames) {
        for pid in &mut self.pids {
            pid.custom_name = names.alias(&pid.name).map(str::to_string);
        }
    }

    pub fn pids(&self) -> &[PidInfo] {
        &self.pids
    }

    /// Case-insensitive lookup by logged name or custom alias.
    pub fn find(&self, name: &str) -> Option<&PidInfo> {
        let wanted = name.trim().to_lowercase();
        self.pids.iter().find(|p| p.name.to_lowercase() == wanted).or_else(|| {
            self.pids
                .iter()
                .find(|p| p.custom_name.as_ref().is_some_and(|c| c.to_lowercase() == wanted))
        })
    }

    pub fn get(&self, kind: PidKind) -> Option<&PidInfo> {
        self.pids.iter().find(|p| p.kind == kind)
    }

    /// Resolve a list of names, failing on the first unknown one.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<PidKind>> {
        names
            .iter()
            .map(|n| {
                self.find(n)
                    .map(|p| p.kind)
                    .ok_or_else(|| HistoError::UnknownPid(n.clone()))
            })
            .collect()
    }
}

fn is_pid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("NoName")
        && !name.to_lowercase().starts_with("column")
        && !name.eq_ignore_ascii_case("time")
}

/// Guess a unit from a column name when the log has no units row.
pub fn infer_unit(column_name: &str) -> String {
    let lower = column_name.to_lowercase();

    if lower.contains("rpm") || lower.contains("engine speed") {
        "rpm".to_string()
    } else if lower.contains("ratio") {
        String::new()
    } else if lower.contains("map") || lower.contains("baro") || lower.contains("pressure") || lower.contains("boost") {
        "kPa".to_string()
    } else if lower.contains("ect") || lower.contains("iat") || lower.contains("temp") {
        "\u{00B0}F".to_string()
    } else if lower.contains("adap") || lower.contains("trim") || lower.contains("duty") || lower.contains("tps") {
        "%".to_string()
    } else if lower.contains(" pw") || lower.contains("pulse") {
        "ms".to_string()
    } else if lower.contains("spark") || lower.contains("timing") || lower.contains("advance") {
        "\u{00B0}".to_string()
    } else if lower.contains("volt") || lower.contains("o2") {
        "V".to_string()
    } else if lower.contains("speed") {
        "mph".to_string()
    } else {
        String::new()
    }
}
