//! The fixed fact vocabulary and the per-run fact set.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Whether a field keeps the last value or accumulates every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    /// Later writes overwrite earlier ones.
    Scalar,
    /// Values are appended, newline-joined.
    Multi,
}

macro_rules! fields {
    ($($(#[$meta:meta])* $variant:ident => $name:literal, $kind:ident;)+) => {
        /// Every fact the extractor can record.
        ///
        /// Names double as regex capture-group names in the line catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Field {
            $($(#[$meta])* $variant,)+
        }

        impl Field {
            /// All fields in declaration order.
            pub const ALL: &'static [Field] = &[$(Field::$variant,)+];

            /// Snake-case field name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Field::$variant => $name,)+
                }
            }

            /// Scalar or multi-valued.
            pub fn kind(self) -> FactKind {
                match self {
                    $(Field::$variant => FactKind::$kind,)+
                }
            }

            /// Look a field up by name.
            pub fn from_name(name: &str) -> Option<Field> {
                match name {
                    $($name => Some(Field::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

fields! {
    /// Emulator version from the run header.
    BuildVersion => "build_version", Scalar;
    /// Build number from the run header.
    BuildNumber => "build_number", Scalar;
    /// Short commit hash from the run header.
    BuildCommit => "build_commit", Scalar;
    /// Branch the build came from.
    BuildBranch => "build_branch", Scalar;
    /// Build timestamp.
    BuildDate => "build_date", Scalar;
    /// Host CPU model string.
    CpuModel => "cpu_model", Scalar;
    /// Hardware threads available to the emulator.
    ThreadCount => "thread_count", Scalar;
    /// Host OS family inferred from path style.
    OsPath => "os_path", Scalar;
    /// Installed console firmware version.
    FwVersionInstalled => "fw_version_installed", Scalar;
    /// Game product code.
    Serial => "serial", Scalar;
    /// Game title.
    GameTitle => "game_title", Scalar;
    /// Two-letter content category (`DG`, `HG`, ...).
    GameCategory => "game_category", Scalar;
    /// Executable the game was booted from.
    ElfBootPath => "elf_boot_path", Scalar;
    /// PPU decoder setting.
    PpuDecoder => "ppu_decoder", Scalar;
    /// Renderer setting.
    Renderer => "renderer", Scalar;
    /// VSync setting.
    Vsync => "vsync", Scalar;
    /// Thread scheduler setting.
    ThreadScheduler => "thread_scheduler", Scalar;
    /// Vertex cache disable setting.
    DisableVertexCache => "disable_vertex_cache", Scalar;
    /// GPU name as reported by the graphics API.
    GpuInfo => "gpu_info", Scalar;
    /// OpenGL version.
    OpenglVersion => "opengl_version", Scalar;
    /// GLSL version.
    GlslVersion => "glsl_version", Scalar;
    /// GPU driver version.
    DriverVersionInfo => "driver_version_info", Scalar;
    /// Directory a disc game was loaded from.
    LdrDisc => "ldr_disc", Scalar;
    /// Serial directory an HDD game was loaded from.
    LdrGameSerial => "ldr_game_serial", Scalar;
    /// Boot path went through `/host_root/`.
    HostRootInBoot => "host_root_in_boot", Scalar;
    /// Fatal error messages.
    FatalError => "fatal_error", Multi;
    /// Content decryption failed.
    FailedToDecrypt => "failed_to_decrypt", Scalar;
    /// Game failed to boot.
    FailedToBoot => "failed_to_boot", Scalar;
    /// Corrupt EDAT block offset.
    EdatBlockOffset => "edat_block_offset", Scalar;
    /// Missing license files.
    RapFile => "rap_file", Multi;
    /// Disc directories that failed to open.
    BrokenDirectory => "broken_directory", Multi;
    /// Disc files that failed to open.
    BrokenFilename => "broken_filename", Multi;
    /// Shader compilation failed.
    ShaderCompileError => "shader_compile_error", Scalar;
    /// PPU executables with patches applied.
    PpuHashPatch => "ppu_hash_patch", Multi;
    /// SPU programs with patches applied.
    SpuHashPatch => "spu_hash_patch", Multi;
    /// Pad initialization failed under the native UI.
    NativeUiInput => "native_ui_input", Scalar;
    /// XAudio initialization failed.
    XaudioInitError => "xaudio_init_error", Scalar;
    /// Firmware is not installed.
    FwMissingMsg => "fw_missing_msg", Scalar;
    /// A firmware module failed to load.
    FwMissingSomething => "fw_missing_something", Scalar;
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts extracted from one log run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactSet {
    values: BTreeMap<Field, String>,
}

impl FactSet {
    /// Empty fact set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value: scalars overwrite, multi-valued fields append.
    ///
    /// Values are trimmed; empty values are ignored.
    pub fn record(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match field.kind() {
            FactKind::Scalar => {
                self.values.insert(field, value.to_owned());
            }
            FactKind::Multi => {
                let entry = self.values.entry(field).or_default();
                if !entry.is_empty() {
                    entry.push('\n');
                }
                entry.push_str(value);
            }
        }
    }

    /// Raw value. Multi-valued fields are newline-joined.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Whether the field holds a value.
    pub fn has(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Whether the field equals `expected` exactly.
    pub fn is(&self, field: Field, expected: &str) -> bool {
        self.get(field) == Some(expected)
    }

    /// Distinct values of a field in first-seen order.
    pub fn values(&self, field: Field) -> Vec<&str> {
        let mut seen = Vec::new();
        if let Some(raw) = self.get(field) {
            for value in raw.lines() {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
        }
        seen
    }

    /// Number of populated fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field is populated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Populated fields in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }
}
