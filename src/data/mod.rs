/// Data layer: input files, the line log, and the velocity transform.
///
/// Architecture:
/// ```text
///  spectrum.ascii     linelist.lst        linefinder.log
///        │                 │                    ▲  │
///        ▼                 ▼                    │  ▼
///   ┌──────────┐     ┌──────────┐          ┌──────────┐
///   │ spectrum  │     │ linelist  │          │ logbook   │  LogStore + indexes
///   └──────────┘     └──────────┘          └──────────┘
///        │                 │                    │
///        └────────┬────────┘                    │
///                 ▼                             │
///          ┌──────────┐                         │
///          │ velocity  │  λ → v around a line ◄─┘ (markers)
///          └──────────┘
/// ```

pub mod linelist;
pub mod logbook;
pub mod spectrum;
pub mod velocity;
