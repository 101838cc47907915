//! Rules about the game, its dump, firmware and runtime errors.

use crate::extractor::{FactSet, Field};

use super::integrity::IntegrityVerdict;
use super::version::DottedVersion;
use super::{Note, Severity};

/// Oldest firmware that is known to work well.
pub const MINIMUM_FIRMWARE_VERSION: DottedVersion = DottedVersion::new(4, 80);

/// Serials whose games misrender unless the vertex cache is disabled.
pub const KNOWN_DISABLE_VERTEX_CACHE_IDS: &[&str] = &["NPEB00258", "NPUB30162", "NPJB00068"];

const DISABLED: &str = "false";

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn is_network_serial(value: Option<&str>) -> bool {
    value.is_some_and(|v| starts_with_ignore_case(v, "NP"))
}

fn ends_with_eboot(path: &str) -> bool {
    path.to_ascii_uppercase().ends_with("EBOOT.BIN")
}

/// Classify a fatal error: corrupted save data or missing OpenGL support.
pub fn check_fatal_error(facts: &FactSet) -> Option<Note> {
    let fatal = facts.get(Field::FatalError)?;
    if fatal.contains("psf.cpp") || fatal.contains("invalid map<K, T>") {
        Some(Note::new(
            Severity::Advisory,
            "Game save data might be corrupted",
        ))
    } else if fatal.contains("Could not bind OpenGL context") {
        Some(Note::new(
            Severity::Critical,
            "GPU or installed GPU drivers do not support OpenGL 4.3",
        ))
    } else {
        None
    }
}

/// Decryption and boot failures.
pub fn check_decrypt_and_boot(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();
    if facts.has(Field::FailedToDecrypt) {
        notes.push(Note::new(
            Severity::Critical,
            "Failed to decrypt game content, license file might be corrupted",
        ));
    }
    if facts.has(Field::FailedToBoot) {
        notes.push(Note::new(
            Severity::Critical,
            "Failed to boot the game, the dump might be encrypted or corrupted",
        ));
    }
    notes
}

/// Missing or corrupted files, confirmed by the manifest or a bad EDAT block.
pub fn check_broken_dump(facts: &FactSet, verdict: &IntegrityVerdict) -> Option<Note> {
    let broken = matches!(verdict, IntegrityVerdict::Checked { broken: true })
        || facts.has(Field::EdatBlockOffset);
    if broken {
        Some(Note::new(
            Severity::Critical,
            "Some game files are missing or corrupted, please re-dump and validate.",
        ))
    } else if matches!(verdict, IntegrityVerdict::Checked { broken: false }) {
        Some(Note::new(
            Severity::Informational,
            "Checked missing files against IRD",
        ))
    } else {
        None
    }
}

/// Installed firmware must parse and be at least [`MINIMUM_FIRMWARE_VERSION`].
pub fn check_firmware(facts: &FactSet) -> Option<Note> {
    let installed = facts.get(Field::FwVersionInstalled)?;
    match DottedVersion::parse(installed) {
        Some(version) if version < MINIMUM_FIRMWARE_VERSION => Some(Note::new(
            Severity::Advisory,
            format!("Firmware version {MINIMUM_FIRMWARE_VERSION} or later is recommended"),
        )),
        Some(_) => None,
        None => Some(Note::new(
            Severity::Advisory,
            "Custom firmware is not supported, please use the latest official one",
        )),
    }
}

/// Retail games booted as loose executables.
pub fn check_boot_path(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();
    let elf_path = facts.get(Field::ElfBootPath).unwrap_or_default();
    let is_eboot = !elf_path.is_empty() && ends_with_eboot(elf_path);
    let is_elf = !elf_path.is_empty() && !is_eboot;

    if facts.has(Field::HostRootInBoot) && is_eboot {
        notes.push(Note::new(
            Severity::Critical,
            "Retail game booted as an ELF through the `/root_host/`, probably due to passing path as an argument; please boot through the game library list for now",
        ));
    }
    if facts.has(Field::Serial) && is_elf {
        let file_name = elf_path.rsplit(['/', '\\']).next().unwrap_or(elf_path);
        notes.push(Note::new(
            Severity::Advisory,
            format!("Retail game booted directly through `{file_name}`, which is not recommended"),
        ));
    }
    notes
}

/// Logs that never reached the point of running a game.
pub fn check_empty_log(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();
    let boot_again = Note::new(
        Severity::Informational,
        "Please boot the game and upload a new log",
    );

    if !facts.has(Field::Serial) && !facts.has(Field::GameTitle) {
        if let Some(firmware) = facts.get(Field::FwVersionInstalled) {
            notes.push(Note::new(
                Severity::Informational,
                format!("The log contains only installation of firmware {firmware}"),
            ));
            notes.push(boot_again.clone());
        }
    }
    if !facts.has(Field::PpuDecoder) || !facts.has(Field::Renderer) {
        notes.push(Note::new(Severity::Informational, "The log is empty"));
        notes.push(boot_again);
    }
    notes
}

/// Shader failures, phrased by whether the GPU is supported at all.
pub fn check_shader_errors(facts: &FactSet, supported_gpu: bool) -> Option<Note> {
    if !facts.has(Field::ShaderCompileError) {
        return None;
    }
    let text = if supported_gpu {
        "Shader compilation error might indicate shader cache corruption"
    } else {
        "Shader compilation error on unsupported GPU"
    };
    Some(Note::new(Severity::Critical, text))
}

/// Game-specific patches were applied.
pub fn check_patches(facts: &FactSet) -> Option<Note> {
    (facts.has(Field::PpuHashPatch) || facts.has(Field::SpuHashPatch)).then(|| {
        Note::new(
            Severity::Informational,
            "Game-specific patches were applied",
        )
    })
}

/// Games that need the vertex cache disabled.
pub fn check_vertex_cache(facts: &FactSet) -> Option<Note> {
    let serial = facts.get(Field::Serial)?;
    let known = KNOWN_DISABLE_VERTEX_CACHE_IDS
        .iter()
        .any(|id| id.eq_ignore_ascii_case(serial));
    (known && facts.is(Field::DisableVertexCache, DISABLED)).then(|| {
        Note::new(
            Severity::Advisory,
            "This game requires disabling `Vertex Cache` in the GPU tab of the Settings",
        )
    })
}

/// Disc-category correlations, including disc games installed as packages.
///
/// A `DG` (disc game) category with a network (`NP*`) serial, or an `HG`
/// (HDD game) category without one, means a disc dump was repacked and
/// installed as a PKG.
pub fn check_disc_category(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();
    let serial = facts.get(Field::Serial);
    let category = facts.get(Field::GameCategory);

    let mut disc_inside_game = false;
    let mut disc_as_pkg = false;
    if category == Some("DG") {
        disc_inside_game = facts.has(Field::LdrDisc) && !is_network_serial(serial);
        disc_as_pkg = is_network_serial(serial) || is_network_serial(facts.get(Field::LdrGameSerial));
    }
    if category == Some("HG") && !is_network_serial(serial) {
        disc_as_pkg = true;
    }

    if disc_inside_game {
        let disc = facts.get(Field::LdrDisc).unwrap_or_default();
        notes.push(Note::new(
            Severity::Critical,
            format!("Disc game inside `{disc}`"),
        ));
    }
    if disc_as_pkg {
        notes.push(Note::new(Severity::Piracy, "Disc game installed as a PKG"));
    }
    notes
}

/// Pad, audio and firmware initialization failures.
pub fn check_runtime_errors(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();
    if facts.has(Field::NativeUiInput) {
        notes.push(Note::new(
            Severity::Advisory,
            "Pad initialization problem detected; try disabling `Native UI`",
        ));
    }
    if facts.has(Field::XaudioInitError) {
        notes.push(Note::new(
            Severity::Critical,
            "XAudio initialization failed; make sure you have audio output device working",
        ));
    }
    if facts.has(Field::FwMissingMsg) || facts.has(Field::FwMissingSomething) {
        notes.push(Note::new(
            Severity::Critical,
            "PS3 firmware is missing or corrupted",
        ));
    }
    notes
}
