use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::linelist::LineList;
use super::velocity::observed_wavelength;
use crate::error::{LinefinderError, Result, Warning};

/// Default blue/red bounds (km/s) given to a freshly selected line.
pub const DEFAULT_LINE_BOUNDS: (f64, f64) = (-50.0, 50.0);

const LINE_LIST_HEADER: &str = "#!Line List: ";
const SPECTRUM_HEADER: &str = "#!Spectrum: ";
const COLUMN_HEADER: &str = "#z;\t\tIon;\tline;\tflag;\tvmin;\tvmax;\tNotes;\tcolour";

// ---------------------------------------------------------------------------
// Redshift – the canonical 5-decimal key
// ---------------------------------------------------------------------------

/// A system redshift as it appears in the log. The string, not the float, is
/// the identity: two systems are the same when their 5-decimal forms match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Redshift(String);

impl Redshift {
    pub fn from_value(z: f64) -> Self {
        Redshift(format!("{z:.5}"))
    }

    /// Keep a log field as written, trimmed. Use [`Redshift::is_canonical`]
    /// to find out whether it is well formed.
    pub fn from_field(s: &str) -> Self {
        Redshift(s.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|z| z.is_finite())
    }

    pub fn is_canonical(&self) -> bool {
        self.value().is_some_and(|z| format!("{z:.5}") == self.0)
    }
}

impl fmt::Display for Redshift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Flags – quality bitmask
// ---------------------------------------------------------------------------

/// Line quality bitmask. Bits are independent; `0` means skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u32);

impl Flags {
    pub const SKIP: Flags = Flags(0);
    pub const OK: u32 = 1;
    pub const BLEND: u32 = 2;
    pub const UPPER_LIMIT: u32 = 4;
    pub const LOWER_LIMIT: u32 = 8;

    pub fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub fn from_parts(ok: bool, blend: bool, upper_limit: bool, lower_limit: bool) -> Self {
        let mut bits = 0;
        if ok {
            bits |= Self::OK;
        }
        if blend {
            bits |= Self::BLEND;
        }
        if upper_limit {
            bits |= Self::UPPER_LIMIT;
        }
        if lower_limit {
            bits |= Self::LOWER_LIMIT;
        }
        Flags(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self.0 & Self::OK != 0
    }

    pub fn is_blend(self) -> bool {
        self.0 & Self::BLEND != 0
    }

    pub fn is_upper_limit(self) -> bool {
        self.0 & Self::UPPER_LIMIT != 0
    }

    pub fn is_lower_limit(self) -> bool {
        self.0 & Self::LOWER_LIMIT != 0
    }

    /// `(ok, blend, upper_limit, lower_limit)`
    pub fn parts(self) -> (bool, bool, bool, bool) {
        (
            self.is_ok(),
            self.is_blend(),
            self.is_upper_limit(),
            self.is_lower_limit(),
        )
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// ---------------------------------------------------------------------------
// Colour – fixed display palette
// ---------------------------------------------------------------------------

/// Display colours a logged line can be drawn with. Stored in the log by
/// their single-letter code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Colour {
    Red,
    #[default]
    Black,
    Blue,
    Cyan,
    Magenta,
    Green,
}

impl Colour {
    pub const ALL: [Colour; 6] = [
        Colour::Red,
        Colour::Black,
        Colour::Blue,
        Colour::Cyan,
        Colour::Magenta,
        Colour::Green,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Colour::Red => "r",
            Colour::Black => "k",
            Colour::Blue => "b",
            Colour::Cyan => "c",
            Colour::Magenta => "m",
            Colour::Green => "g",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Colour::ALL.into_iter().find(|c| c.code() == code.trim())
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// LineKey / LogEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey {
    pub redshift: Redshift,
    pub ion: String,
    pub short_id: String,
}

impl LineKey {
    pub fn new(redshift: Redshift, ion: impl Into<String>, short_id: impl Into<String>) -> Self {
        LineKey {
            redshift,
            ion: ion.into(),
            short_id: short_id.into(),
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z={} ({}, {})", self.redshift, self.ion, self.short_id)
    }
}

/// What the user recorded about one identified line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub flags: Flags,
    /// Blue velocity bound, km/s.
    pub vmin: f64,
    /// Red velocity bound, km/s.
    pub vmax: f64,
    pub notes: String,
    pub colour: Colour,
}

impl LogEntry {
    /// An entry for a line that has just been selected and not yet edited.
    pub fn fresh(bounds: (f64, f64)) -> Self {
        LogEntry {
            flags: Flags::SKIP,
            vmin: bounds.0,
            vmax: bounds.1,
            notes: String::new(),
            colour: Colour::Black,
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        LogEntry::fresh(DEFAULT_LINE_BOUNDS)
    }
}

/// Input files a log was produced from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub line_list: String,
    pub spectrum: String,
}

/// A logged line projected onto the spectrum's wavelength axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMarker {
    pub key: LineKey,
    pub wavelength: f64,
    pub colour: Colour,
}

impl LineMarker {
    pub fn label(&self) -> String {
        format!("z={}\n{} {}", self.key.redshift, self.key.ion, self.key.short_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Written { path: PathBuf, records: usize },
    NoDestination,
}

// ---------------------------------------------------------------------------
// LogStore
// ---------------------------------------------------------------------------

/// Every identified line plus the redshift / ion / short-id indexes used to
/// order output and populate the editor.
///
/// The indexes always equal the projection of `entries`: a value is listed
/// if and only if at least one entry carries it. Each mutating method repairs
/// them before returning.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    entries: BTreeMap<LineKey, LogEntry>,
    redshifts: Vec<Redshift>,
    ions: Vec<String>,
    short_ids: BTreeMap<String, Vec<String>>,
    provenance: Option<Provenance>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a log file. A missing file is an empty store, not an error.
    pub fn load(path: &Path) -> Result<(Self, Vec<Warning>)> {
        if !path.is_file() {
            log::info!(
                "Log file {} not found, it will be created on save",
                path.display()
            );
            return Ok((Self::new(), Vec::new()));
        }
        let bytes = std::fs::read(path).map_err(|source| LinefinderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (store, warnings) = Self::parse(&bytes).map_err(|source| LinefinderError::Log {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded {} logged lines from {}", store.len(), path.display());
        Ok((store, warnings))
    }

    /// Parse log bytes. Fields that are not valid UTF-8 are decoded lossily
    /// and reported, the rest of the record is kept.
    fn parse(bytes: &[u8]) -> std::result::Result<(Self, Vec<Warning>), csv::Error> {
        let mut store = LogStore::new();
        let mut warnings = Vec::new();

        let mut provenance = Provenance::default();
        let mut has_header = false;
        for line in String::from_utf8_lossy(bytes).lines() {
            if let Some(rest) = line.strip_prefix(LINE_LIST_HEADER) {
                provenance.line_list = rest.trim().to_string();
                has_header = true;
            } else if let Some(rest) = line.strip_prefix(SPECTRUM_HEADER) {
                provenance.spectrum = rest.trim().to_string();
                has_header = true;
            }
        }
        if has_header {
            store.provenance = Some(provenance);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(bytes);

        for raw in reader.byte_records() {
            let raw = raw?;
            let line = raw.position().map_or(0, |p| p.line() as usize);
            let record: Vec<Cow<str>> = raw.iter().map(String::from_utf8_lossy).collect();
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            if record.iter().any(|field| matches!(field, Cow::Owned(_))) {
                warnings.push(
                    Warning::BadLogField {
                        line,
                        message: "invalid UTF-8 replaced".into(),
                    }
                    .logged(),
                );
            }
            if record.len() < 8 {
                warnings.push(
                    Warning::BadLogField {
                        line,
                        message: format!("expected 8 fields, found {}", record.len()),
                    }
                    .logged(),
                );
                continue;
            }

            let redshift = Redshift::from_field(&record[0]);
            if !redshift.is_canonical() {
                warnings.push(Warning::MalformedRedshift(redshift.to_string()).logged());
            }
            let key = LineKey::new(redshift, &*record[1], &*record[2]);

            let mut entry = LogEntry::default();
            match record[3].parse::<u32>() {
                Ok(bits) => entry.flags = Flags::from_bits(bits),
                Err(_) => warnings.push(bad_field(line, "flag", &record[3])),
            }
            match record[4].parse::<f64>() {
                Ok(v) => entry.vmin = v,
                Err(_) => warnings.push(bad_field(line, "vmin", &record[4])),
            }
            match record[5].parse::<f64>() {
                Ok(v) => entry.vmax = v,
                Err(_) => warnings.push(bad_field(line, "vmax", &record[5])),
            }
            entry.notes = record[6].to_string();
            match Colour::from_code(&record[7]) {
                Some(colour) => entry.colour = colour,
                None => warnings.push(bad_field(line, "colour", &record[7])),
            }

            store.upsert(key, entry);
        }

        Ok((store, warnings))
    }

    /// Write the log. Records are ordered by the redshift index, then ions,
    /// then each ion's short ids. An empty `path` writes nothing.
    pub fn save(&self, path: &Path, provenance: &Provenance) -> Result<SaveOutcome> {
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            Warning::NoSaveDestination.logged();
            return Ok(SaveOutcome::NoDestination);
        }

        let write_err = |source| LinefinderError::Write {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        let records = self.write_records(&mut out, provenance).map_err(write_err)?;
        out.flush().map_err(write_err)?;

        log::info!("Wrote {records} logged lines to {}", path.display());
        Ok(SaveOutcome::Written {
            path: path.to_path_buf(),
            records,
        })
    }

    fn write_records(&self, out: &mut impl Write, provenance: &Provenance) -> std::io::Result<usize> {
        writeln!(out, "{LINE_LIST_HEADER}{}", provenance.line_list)?;
        writeln!(out, "{SPECTRUM_HEADER}{}", provenance.spectrum)?;
        writeln!(out, "{COLUMN_HEADER}")?;
        let mut n = 0;
        for (key, entry) in self.iter() {
            writeln!(
                out,
                "{};\t{};\t{};\t{};\t{};\t{};\t{};\t{};",
                key.redshift,
                key.ion,
                key.short_id,
                entry.flags,
                entry.vmin,
                entry.vmax,
                entry.notes,
                entry.colour,
            )?;
            n += 1;
        }
        Ok(n)
    }

    // -- mutation --

    /// Insert or overwrite the entry at `key`, returning the previous one.
    /// Notes are stored in their on-disk form.
    pub fn upsert(&mut self, key: LineKey, mut entry: LogEntry) -> Option<LogEntry> {
        entry.notes = sanitize_notes(&entry.notes);
        if !self.redshifts.contains(&key.redshift) {
            self.redshifts.push(key.redshift.clone());
        }
        if !self.ions.contains(&key.ion) {
            self.ions.push(key.ion.clone());
        }
        let ids = self.short_ids.entry(key.ion.clone()).or_default();
        if !ids.contains(&key.short_id) {
            ids.push(key.short_id.clone());
        }
        self.entries.insert(key, entry)
    }

    /// Remove one line. Index values still used by other entries stay.
    pub fn remove_line(&mut self, key: &LineKey) -> Option<LogEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.prune_indexes();
        }
        removed
    }

    /// Remove every line of the system at `redshift`; returns how many went.
    pub fn remove_system(&mut self, redshift: &Redshift) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.redshift != *redshift);
        let removed = before - self.entries.len();
        self.redshifts.retain(|z| z != redshift);
        self.prune_indexes();
        removed
    }

    fn prune_indexes(&mut self) {
        let mut zs = BTreeSet::new();
        let mut lines = BTreeSet::new();
        for key in self.entries.keys() {
            zs.insert(&key.redshift);
            lines.insert((key.ion.as_str(), key.short_id.as_str()));
        }

        self.redshifts.retain(|z| zs.contains(z));
        for (ion, ids) in self.short_ids.iter_mut() {
            ids.retain(|id| lines.contains(&(ion.as_str(), id.as_str())));
        }
        self.short_ids.retain(|_, ids| !ids.is_empty());
        let short_ids = &self.short_ids;
        self.ions.retain(|ion| short_ids.contains_key(ion));
    }

    // -- queries --

    pub fn get(&self, key: &LineKey) -> Option<&LogEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &LineKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The stored entry, or a fresh one with `bounds` when absent.
    pub fn entry_or_default(&self, key: &LineKey, bounds: (f64, f64)) -> LogEntry {
        self.get(key)
            .cloned()
            .unwrap_or_else(|| LogEntry::fresh(bounds))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in save order.
    pub fn iter(&self) -> impl Iterator<Item = (&LineKey, &LogEntry)> + '_ {
        self.redshifts.iter().flat_map(move |z| {
            self.ions.iter().flat_map(move |ion| {
                self.short_ids(ion)
                    .iter()
                    .filter_map(move |id| self.entries.get_key_value(&LineKey::new(z.clone(), ion, id)))
            })
        })
    }

    pub fn redshifts(&self) -> &[Redshift] {
        &self.redshifts
    }

    /// Redshifts in numeric order; malformed keys sort last.
    pub fn sorted_redshifts(&self) -> Vec<Redshift> {
        let mut zs = self.redshifts.clone();
        zs.sort_by(|a, b| match (a.value(), b.value()) {
            (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        zs
    }

    pub fn ions(&self) -> &[String] {
        &self.ions
    }

    pub fn short_ids(&self, ion: &str) -> &[String] {
        self.short_ids.get(ion).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ions with at least one line logged at `redshift`.
    pub fn ions_at(&self, redshift: &Redshift) -> Vec<&str> {
        self.ions
            .iter()
            .filter(|ion| !self.short_ids_at(redshift, ion).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Short ids of `ion` logged at `redshift`.
    pub fn short_ids_at(&self, redshift: &Redshift, ion: &str) -> Vec<&str> {
        self.short_ids(ion)
            .iter()
            .filter(|id| self.contains(&LineKey::new(redshift.clone(), ion, id.as_str())))
            .map(String::as_str)
            .collect()
    }

    /// Provenance header of the file this store was loaded from.
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Observed-frame markers for every entry the line list can place.
    pub fn markers(&self, line_list: &LineList) -> Vec<LineMarker> {
        self.iter()
            .filter_map(|(key, entry)| {
                let def = line_list.get(&key.ion, &key.short_id)?;
                let z = key.redshift.value()?;
                Some(LineMarker {
                    key: key.clone(),
                    wavelength: observed_wavelength(def.rest_wavelength, z),
                    colour: entry.colour,
                })
            })
            .collect()
    }

    /// One warning per logged line the line list does not define.
    pub fn unknown_lines(&self, line_list: &LineList) -> Vec<Warning> {
        self.iter()
            .filter(|(key, _)| !line_list.contains(&key.ion, &key.short_id))
            .map(|(key, _)| Warning::UnknownLine {
                ion: key.ion.clone(),
                short_id: key.short_id.clone(),
            })
            .collect()
    }
}

fn bad_field(line: usize, field: &str, value: &str) -> Warning {
    Warning::BadLogField {
        line,
        message: format!("invalid {field} '{value}'"),
    }
    .logged()
}

/// Notes share a line with the record delimiter, and fields are trimmed on
/// read.
fn sanitize_notes(notes: &str) -> String {
    notes.replace(['\n', '\r'], " ").replace(';', ",").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::linelist::LineDefinition;
    use tempfile::TempDir;

    fn key(z: &str, ion: &str, id: &str) -> LineKey {
        LineKey::new(Redshift::from_field(z), ion, id)
    }

    fn entry(flags: u32, notes: &str, colour: Colour) -> LogEntry {
        LogEntry {
            flags: Flags::from_bits(flags),
            vmin: -50.0,
            vmax: 50.0,
            notes: notes.to_string(),
            colour,
        }
    }

    /// Indexes must equal the projection of the entries.
    fn assert_consistent(store: &LogStore) {
        let zs: BTreeSet<_> = store.entries.keys().map(|k| k.redshift.clone()).collect();
        let ions: BTreeSet<_> = store.entries.keys().map(|k| k.ion.clone()).collect();
        let lines: BTreeSet<_> = store
            .entries
            .keys()
            .map(|k| (k.ion.clone(), k.short_id.clone()))
            .collect();

        assert_eq!(store.redshifts.iter().cloned().collect::<BTreeSet<_>>(), zs);
        assert_eq!(store.redshifts.len(), zs.len());
        assert_eq!(store.ions.iter().cloned().collect::<BTreeSet<_>>(), ions);
        assert_eq!(store.ions.len(), ions.len());
        let indexed: BTreeSet<_> = store
            .short_ids
            .iter()
            .flat_map(|(ion, ids)| ids.iter().map(move |id| (ion.clone(), id.clone())))
            .collect();
        assert_eq!(indexed, lines);
    }

    fn provenance() -> Provenance {
        Provenance {
            line_list: "linelist.lst".into(),
            spectrum: "test.ascii".into(),
        }
    }

    #[test]
    fn redshift_key_is_five_decimals() {
        assert_eq!(Redshift::from_value(0.1234).as_str(), "0.12340");
        assert_eq!(Redshift::from_value(0.0), Redshift::from_field(" 0.00000 "));
        assert!(Redshift::from_value(2.5).is_canonical());
        assert!(!Redshift::from_field("0.1234").is_canonical());
        assert!(!Redshift::from_field("abc").is_canonical());
    }

    #[test]
    fn flags_round_trip_all_combinations() {
        for bits in 0..16u32 {
            let (ok, blend, upper, lower) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let flags = Flags::from_parts(ok, blend, upper, lower);
            assert_eq!(flags.bits(), bits);
            assert_eq!(flags.parts(), (ok, blend, upper, lower));
        }
        assert_eq!(Flags::from_parts(true, true, false, false).bits(), 3);
    }

    #[test]
    fn colour_codes() {
        for c in Colour::ALL {
            assert_eq!(Colour::from_code(c.code()), Some(c));
        }
        assert_eq!(Colour::from_code("y"), None);
        assert_eq!(Colour::default(), Colour::Black);
    }

    #[test]
    fn upsert_indexes_new_values_once() {
        let mut store = LogStore::new();
        assert!(store.upsert(key("0.00000", "HI", "1215"), LogEntry::default()).is_none());
        assert!(store.upsert(key("0.00000", "HI", "1215"), entry(1, "", Colour::Red)).is_some());
        store.upsert(key("0.00000", "HI", "1025"), LogEntry::default());
        store.upsert(key("0.50000", "CIV", "1548"), LogEntry::default());

        assert_eq!(store.len(), 3);
        assert_eq!(store.redshifts().len(), 2);
        assert_eq!(store.ions(), ["HI", "CIV"]);
        assert_eq!(store.short_ids("HI"), ["1215", "1025"]);
        assert_eq!(store.get(&key("0.00000", "HI", "1215")).unwrap().colour, Colour::Red);
        assert_consistent(&store);
    }

    #[test]
    fn save_then_load_reproduces_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("linefinder.log");

        let mut store = LogStore::new();
        let civ = key("0.12340", "CIV", "1548");
        store.upsert(civ.clone(), entry(1, "clean", Colour::Blue));
        store.upsert(
            key("0.12340", "CIV", "1550"),
            LogEntry {
                flags: Flags::from_bits(3),
                vmin: -72.5,
                vmax: 41.25,
                notes: "blended with something".into(),
                colour: Colour::Magenta,
            },
        );
        store.upsert(key("1.00000", "HI", "1215"), entry(8, "", Colour::Black));

        let outcome = store.save(&path, &provenance()).unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Written {
                path: path.clone(),
                records: 3
            }
        );

        let (loaded, warnings) = LogStore::load(&path).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(loaded.len(), store.len());
        for (k, e) in store.iter() {
            assert_eq!(loaded.get(k), Some(e), "{k}");
        }
        let reloaded = loaded.get(&civ).unwrap();
        assert_eq!(reloaded.flags.bits(), 1);
        assert_eq!((reloaded.vmin, reloaded.vmax), (-50.0, 50.0));
        assert_eq!(reloaded.notes, "clean");
        assert_eq!(reloaded.colour, Colour::Blue);
        assert_eq!(loaded.provenance(), Some(&provenance()));
        assert_consistent(&loaded);
    }

    #[test]
    fn save_writes_headers_and_stable_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.log");

        let mut store = LogStore::new();
        store.upsert(key("0.50000", "HI", "1215"), LogEntry::default());
        store.upsert(key("0.10000", "CIV", "1548"), LogEntry::default());
        store.upsert(key("0.50000", "CIV", "1548"), LogEntry::default());
        store.save(&path, &provenance()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#!Line List: linelist.lst");
        assert_eq!(lines[1], "#!Spectrum: test.ascii");
        assert!(lines[2].starts_with('#'));
        assert_eq!(lines[3], "0.50000;\tHI;\t1215;\t0;\t-50;\t50;\t;\tk;");
        assert_eq!(lines[4], "0.50000;\tCIV;\t1548;\t0;\t-50;\t50;\t;\tk;");
        assert_eq!(lines[5], "0.10000;\tCIV;\t1548;\t0;\t-50;\t50;\t;\tk;");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn save_without_destination_is_a_no_op() {
        let store = LogStore::new();
        let outcome = store.save(Path::new(""), &provenance()).unwrap();
        assert_eq!(outcome, SaveOutcome::NoDestination);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let (store, warnings) = LogStore::load(&dir.path().join("none.log")).unwrap();
        assert!(store.is_empty());
        assert!(warnings.is_empty());
        assert!(store.provenance().is_none());
    }

    #[test]
    fn load_is_permissive() {
        let text = "\
#!Line List: a.lst
#!Spectrum: b.ascii
#z; Ion; line; flag; vmin; vmax; Notes; colour
0.1234;\tCIV;\t1548;\t1;\t-50.0;\t50.0;\tloose z;\tb;
0.20000;\tSiII;\t1260;\tx;\tfast;\t30;\t;\ty;
0.30000;\tHI;
";
        let (store, warnings) = LogStore::parse(text.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);

        let loose = store.get(&key("0.1234", "CIV", "1548")).unwrap();
        assert_eq!(loose.notes, "loose z");
        assert!(warnings.contains(&Warning::MalformedRedshift("0.1234".into())));

        let bad = store.get(&key("0.20000", "SiII", "1260")).unwrap();
        assert_eq!(bad.flags, Flags::SKIP);
        assert_eq!(bad.vmin, -50.0);
        assert_eq!(bad.vmax, 30.0);
        assert_eq!(bad.colour, Colour::Black);

        // malformed z, flag, vmin, colour, short record
        assert_eq!(warnings.len(), 5);
        assert_consistent(&store);
    }

    #[test]
    fn remove_system_keeps_lines_used_elsewhere() {
        let mut store = LogStore::new();
        store.upsert(key("0.00000", "HI", "1215"), LogEntry::default());
        store.upsert(key("0.00000", "CIV", "1548"), LogEntry::default());
        store.upsert(key("0.50000", "HI", "1215"), entry(1, "keep", Colour::Green));

        let removed = store.remove_system(&Redshift::from_field("0.00000"));
        assert_eq!(removed, 2);
        assert!(store.iter().all(|(k, _)| k.redshift.as_str() != "0.00000"));
        assert_eq!(store.redshifts(), [Redshift::from_field("0.50000")]);
        assert_eq!(store.ions(), ["HI"]);
        assert_eq!(store.short_ids("HI"), ["1215"]);
        assert!(store.short_ids("CIV").is_empty());
        assert_eq!(store.get(&key("0.50000", "HI", "1215")).unwrap().notes, "keep");
        assert_consistent(&store);
    }

    #[test]
    fn remove_system_of_unknown_redshift_changes_nothing() {
        let mut store = LogStore::new();
        store.upsert(key("0.50000", "HI", "1215"), LogEntry::default());
        assert_eq!(store.remove_system(&Redshift::from_field("9.00000")), 0);
        assert_eq!(store.len(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn remove_line_prunes_only_orphans() {
        let mut store = LogStore::new();
        store.upsert(key("0.00000", "HI", "1215"), LogEntry::default());
        store.upsert(key("0.00000", "HI", "1025"), LogEntry::default());
        store.upsert(key("0.50000", "HI", "1215"), LogEntry::default());

        assert!(store.remove_line(&key("0.00000", "HI", "1025")).is_some());
        assert_eq!(store.short_ids("HI"), ["1215"]);
        assert_eq!(store.redshifts().len(), 2);
        assert_consistent(&store);

        assert!(store.remove_line(&key("0.50000", "HI", "1215")).is_some());
        assert_eq!(store.redshifts(), [Redshift::from_field("0.00000")]);
        assert_eq!(store.short_ids("HI"), ["1215"]);
        assert_consistent(&store);

        assert!(store.remove_line(&key("0.50000", "HI", "1215")).is_none());
    }

    #[test]
    fn editor_cascade_queries() {
        let mut store = LogStore::new();
        store.upsert(key("0.50000", "HI", "1215"), LogEntry::default());
        store.upsert(key("0.50000", "CIV", "1548"), LogEntry::default());
        store.upsert(key("0.10000", "CIV", "1550"), LogEntry::default());
        store.upsert(key("bogus", "CIV", "1550"), LogEntry::default());

        let z = Redshift::from_field("0.50000");
        assert_eq!(store.ions_at(&z), ["HI", "CIV"]);
        assert_eq!(store.short_ids_at(&z, "CIV"), ["1548"]);
        let sorted: Vec<_> = store
            .sorted_redshifts()
            .into_iter()
            .map(|z| z.to_string())
            .collect();
        assert_eq!(sorted, ["0.10000", "0.50000", "bogus"]);
    }

    #[test]
    fn markers_and_unknown_lines_use_line_list() {
        let list = LineList::from_definitions([LineDefinition {
            ion: "CIV".into(),
            short_id: "1548".into(),
            rest_wavelength: 1548.204,
            oscillator_strength: 0.1899,
        }]);
        let mut store = LogStore::new();
        store.upsert(key("1.00000", "HI", "1215"), entry(1, "", Colour::Red));
        store.upsert(key("1.00000", "OVI", "1031"), LogEntry::default());

        let markers = store.markers(&list);
        assert_eq!(markers.len(), 1);
        assert!((markers[0].wavelength - 2431.3402).abs() < 1e-9);
        assert_eq!(markers[0].colour, Colour::Red);
        assert_eq!(markers[0].label(), "z=1.00000\nHI 1215");

        assert_eq!(
            store.unknown_lines(&list),
            [Warning::UnknownLine {
                ion: "OVI".into(),
                short_id: "1031".into()
            }]
        );
    }

    #[test]
    fn entry_or_default_uses_fresh_bounds() {
        let store = LogStore::new();
        let fresh = store.entry_or_default(&key("0.10000", "HI", "1215"), (-80.0, 80.0));
        assert_eq!(fresh.flags, Flags::SKIP);
        assert_eq!((fresh.vmin, fresh.vmax), (-80.0, 80.0));
        assert_eq!(fresh.colour, Colour::Black);
    }

    #[test]
    fn notes_are_kept_on_one_record() {
        assert_eq!(sanitize_notes("a;b\nc"), "a,b c");
        assert_eq!(sanitize_notes("  trailing\n"), "trailing");
    }

    #[test]
    fn notes_with_delimiters_survive_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.log");

        let mut store = LogStore::new();
        let civ = key("0.20000", "CIV", "1548");
        store.upsert(civ.clone(), entry(3, "blend; see CIV\n1550 too ", Colour::Cyan));
        assert_eq!(store.get(&civ).unwrap().notes, "blend, see CIV 1550 too");

        store.save(&path, &provenance()).unwrap();
        let (loaded, warnings) = LogStore::load(&path).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(loaded.get(&civ), store.get(&civ));
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn non_utf8_note_keeps_the_rest_of_the_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.log");
        let mut bytes = b"#!Line List: linelist.lst\n0.10000;\tHI;\t1215;\t1;\t-40;\t40;\tcaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b";\tr;\n0.10000;\tCIV;\t1548;\t2;\t-30;\t30;\tok;\tb;\n");
        std::fs::write(&path, bytes).unwrap();

        let (store, warnings) = LogStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);

        let hi = store.get(&key("0.10000", "HI", "1215")).unwrap();
        assert_eq!(hi.notes, "caf\u{FFFD}");
        assert_eq!(hi.colour, Colour::Red);
        assert_eq!((hi.vmin, hi.vmax), (-40.0, 40.0));

        let civ = store.get(&key("0.10000", "CIV", "1548")).unwrap();
        assert_eq!(civ.flags.bits(), 2);
        assert_eq!(civ.notes, "ok");

        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Warning::BadLogField { .. }), "{warnings:?}");
        assert_consistent(&store);
    }
}
