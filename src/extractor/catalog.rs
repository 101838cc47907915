//! Line patterns recognized by the extractor.
//!
//! Each pattern carries a literal needle that must appear in the line before
//! the regex runs, so most lines cost a handful of substring searches.
//! Capture-group names are [`Field`] names; a pattern may also record a fixed
//! value when it matches.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::facts::{FactSet, Field};

/// Lines starting with this begin a new emulator session.
pub const RUN_BOUNDARY: &str = "RPCS3 v";

struct LinePattern {
    needle: &'static str,
    regex: Regex,
    fixed: Option<(Field, &'static str)>,
}

impl LinePattern {
    fn apply(&self, line: &str, facts: &mut FactSet) {
        if !line.contains(self.needle) {
            return;
        }
        let Some(caps) = self.regex.captures(line) else {
            return;
        };
        for name in self.regex.capture_names().flatten() {
            if let (Some(field), Some(value)) = (Field::from_name(name), caps.name(name)) {
                facts.record(field, value.as_str());
            }
        }
        if let Some((field, value)) = self.fixed {
            facts.record(field, value);
        }
    }
}

const PATTERN_SOURCES: &[(&str, &str, Option<(Field, &str)>)] = &[
    (
        RUN_BOUNDARY,
        r"^RPCS3 v(?P<build_version>\d+(?:\.\d+)+)(?:-(?P<build_number>\d+))?(?:-(?P<build_commit>[0-9a-f]{6,40}))?[^|]*(?:\|\s*(?P<build_branch>[^|\s]+))?",
        None,
    ),
    (
        "Build date: ",
        r"Build date: (?P<build_date>\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?)",
        None,
    ),
    (
        " Thread",
        r"^(?P<cpu_model>[^|@]+?)\s*(?:(?:CPU\s*)?@\s*[\d.]+\s*GHz\s*)?\|\s*(?P<thread_count>\d+) Threads?\b",
        None,
    ),
    ("Path: ", r"\bPath: [A-Za-z]:[/\\]", Some((Field::OsPath, "Windows"))),
    ("Path: /", r"\bPath: /", Some((Field::OsPath, "Linux"))),
    (
        "Firmware version: ",
        r"Firmware version: (?P<fw_version_installed>[^;|]+)",
        None,
    ),
    ("Serial: ", r"Serial: (?P<serial>[A-Za-z]{4}\d{5})", None),
    ("Title: ", r"Title: (?P<game_title>.+)", None),
    ("Category: ", r"Category: (?P<game_category>[A-Z0-9]{2})\b", None),
    ("Elf path: ", r"Elf path: (?P<elf_boot_path>.+)", None),
    ("PPU Decoder: ", r"PPU Decoder: (?P<ppu_decoder>.+)", None),
    ("Renderer: ", r"^\s*Renderer: (?P<renderer>.+)", None),
    ("VSync: ", r"VSync: (?P<vsync>true|false)", None),
    (
        "hread ",
        r"(?i)thread scheduler: (?P<thread_scheduler>true|false)",
        None,
    ),
    (
        "Disable Vertex Cache: ",
        r"Disable Vertex Cache: (?P<disable_vertex_cache>true|false)",
        None,
    ),
    ("GL RENDERER: ", r"GL RENDERER: (?P<gpu_info>.+)", None),
    (
        "Physical device ",
        r"Physical device (?:initialized|intialized)\. GPU=(?P<gpu_info>[^,]+)",
        None,
    ),
    (
        "GL VERSION: ",
        r"GL VERSION: (?P<opengl_version>\d+\.\d+)\S*(?:.* (?P<driver_version_info>\d+\.\d+(?:\.\d+)*)\s*$)?",
        None,
    ),
    ("GLSL VERSION: ", r"GLSL VERSION: (?P<glsl_version>\d+\.\d+)", None),
    (
        "Driver version: ",
        r"Driver version: (?P<driver_version_info>\d+(?:\.\d+)+)",
        None,
    ),
    ("LDR: Disc: ", r"LDR: Disc: (?P<ldr_disc>.+)", None),
    (
        "LDR: Game: ",
        r"LDR: Game: /dev_hdd0/game/(?P<ldr_game_serial>[^/]+)",
        None,
    ),
    (
        "/host_root/",
        r"(?i)boot[^/]*(?P<host_root_in_boot>/host_root/\S*)",
        None,
    ),
    (
        "F ",
        r"^·?F (?:\d+:\d+:\d+\.\d+ )?(?:\{[^}]*\} )?(?P<fatal_error>.+)",
        None,
    ),
    (
        "Failed to decrypt",
        r"(?P<failed_to_decrypt>Failed to decrypt.*)",
        None,
    ),
    ("Failed to boot", r"(?P<failed_to_boot>Failed to boot.*)", None),
    (
        "EDAT: Block at offset ",
        r"EDAT: Block at offset (?P<edat_block_offset>0x[0-9a-fA-F]+)",
        None,
    ),
    (
        "Rap file not found: ",
        r"Rap file not found: (?P<rap_file>.+)",
        None,
    ),
    (
        "Failed to open directory '",
        r"Failed to open directory '/dev_bdvd/(?P<broken_directory>[^']+?)/?'",
        None,
    ),
    (
        "Failed to open file '",
        r"Failed to open file '/dev_bdvd/(?P<broken_filename>[^']+)'",
        None,
    ),
    (
        "hader",
        r"(?i)(?P<shader_compile_error>failed to compile shader|shader compilation failed)",
        None,
    ),
    (
        "PPU executable hash: ",
        r"PPU executable hash: (?P<ppu_hash_patch>PPU-[0-9a-f]+) \(<- [1-9]\d*\)",
        None,
    ),
    (
        "Applied patch",
        r"Applied patch \(hash='(?P<spu_hash_patch>SPU-[0-9a-f]+)'",
        None,
    ),
    (
        "Native UI",
        r"(?P<native_ui_input>Pad handler expected but none initialized.*Native UI.*)",
        None,
    ),
    (
        "XAudio2Create",
        r"(?P<xaudio_init_error>XAudio2Create\(\) failed.*)",
        None,
    ),
    (
        "irmware",
        r"(?P<fw_missing_msg>Firmware not installed.*)",
        None,
    ),
    (
        "Failed to load firmware module",
        r"(?P<fw_missing_something>Failed to load firmware module.*)",
        None,
    ),
];

static CATALOG: LazyLock<Vec<LinePattern>> = LazyLock::new(|| {
    PATTERN_SOURCES
        .iter()
        .filter_map(|(needle, source, fixed)| match Regex::new(source) {
            Ok(regex) => Some(LinePattern {
                needle: *needle,
                regex,
                fixed: *fixed,
            }),
            Err(e) => {
                warn!(pattern = *source, error = %e, "skipping invalid line pattern");
                None
            }
        })
        .collect()
});

/// Apply every pattern to one line, in catalog order.
pub fn scan_line(line: &str, facts: &mut FactSet) {
    for pattern in CATALOG.iter() {
        pattern.apply(line, facts);
    }
}

/// Whether the line opens a new emulator session.
pub fn is_run_boundary(line: &str) -> bool {
    line.starts_with(RUN_BOUNDARY)
}
