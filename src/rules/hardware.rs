//! CPU and GPU rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::extractor::{FactSet, Field};

use super::version::DottedVersion;
use super::{Note, Severity};

/// Lowest OpenGL version the emulator runs on.
pub const MINIMUM_OPENGL_VERSION: DottedVersion = DottedVersion::new(4, 3);
/// nVidia drivers older than this have known rendering bugs on Windows.
pub const NVIDIA_RECOMMENDED_OLD_WINDOWS_VERSION: DottedVersion = DottedVersion::new(399, 41);
/// First 400-series driver with the Vulkan fullscreen freeze.
pub const NVIDIA_FULLSCREEN_BUG_MIN_VERSION: DottedVersion = DottedVersion::new(400, 0);
/// First driver with the fullscreen freeze fixed.
pub const NVIDIA_FULLSCREEN_BUG_MAX_VERSION: DottedVersion = DottedVersion::new(411, 70);

const DISABLED: &str = "false";

static INTEL_GPU_MODEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"Intel\(R\)\s+(?:(?:U?HD|Iris(?:\s+(?:Pro|Plus))?)\s+)?Graphics(?:\s+(?P<gpu_model_number>P?\d+))?",
    )
    .ok()
});

/// Outcome of the GPU rules.
#[derive(Debug, Clone)]
pub struct GpuAssessment {
    /// Notes produced.
    pub notes: Vec<Note>,
    /// Whether the GPU meets the minimum feature level.
    pub supported: bool,
}

fn is_nvidia(gpu: &str) -> bool {
    gpu.contains("GeForce") || gpu.contains("Quadro") || gpu.to_ascii_lowercase().contains("nvidia")
}

/// CPU family and hardware thread count.
///
/// Family checks are first-match-wins on the model string.
pub fn check_cpu(facts: &FactSet) -> Vec<Note> {
    let mut notes = Vec::new();

    if let Some(cpu) = facts.get(Field::CpuModel) {
        if cpu.starts_with("AMD") {
            if cpu.contains("Ryzen") {
                if !facts.is(Field::OsPath, "Linux") && facts.is(Field::ThreadScheduler, DISABLED) {
                    notes.push(Note::new(
                        Severity::Advisory,
                        "Please enable `Thread scheduler` option in the CPU Settings",
                    ));
                }
            } else {
                notes.push(Note::new(
                    Severity::Advisory,
                    "AMD CPUs before Ryzen are too weak for PS3 emulation",
                ));
            }
        } else if cpu.starts_with("Intel")
            && ["Core2", "Celeron", "Atom", "Pentium"]
                .iter()
                .any(|family| cpu.contains(family))
        {
            notes.push(Note::new(
                Severity::Advisory,
                "This CPU is too old and/or too weak for PS3 emulation",
            ));
        }
    }

    if let Some(threads) = facts
        .get(Field::ThreadCount)
        .and_then(|t| t.trim().parse::<u32>().ok())
    {
        if threads < 4 {
            let plural = if threads == 1 { "" } else { "s" };
            notes.push(Note::new(
                Severity::Advisory,
                format!("This CPU only has {threads} hardware thread{plural} enabled"),
            ));
        }
    }

    notes
}

/// Effective OpenGL version: the newer of the GL version and the GLSL
/// version with its minor component divided by ten (`4.60` reads as `4.6`).
pub fn effective_opengl_version(facts: &FactSet) -> Option<DottedVersion> {
    let gl = facts
        .get(Field::OpenglVersion)
        .and_then(DottedVersion::parse);
    let glsl = facts
        .get(Field::GlslVersion)
        .and_then(DottedVersion::parse)
        .map(|v| DottedVersion::new(v.major(), v.minor() / 10));
    match (gl, glsl) {
        (Some(gl), Some(glsl)) => Some(gl.max(glsl)),
        (gl, glsl) => gl.or(glsl),
    }
}

/// OpenGL floor, Intel iGPU generation and nVidia driver checks.
pub fn check_gpu(facts: &FactSet) -> GpuAssessment {
    let mut notes = Vec::new();
    let mut supported = true;

    if let Some(version) = effective_opengl_version(facts) {
        if version < MINIMUM_OPENGL_VERSION {
            notes.push(Note::new(
                Severity::Critical,
                format!(
                    "GPU only supports OpenGL {}.{}, which is below the minimum requirement of {MINIMUM_OPENGL_VERSION}",
                    version.major(),
                    version.minor()
                ),
            ));
            supported = false;
        }
    }

    let Some(gpu) = facts.get(Field::GpuInfo).filter(|_| supported) else {
        return GpuAssessment { notes, supported };
    };

    if let Some(caps) = INTEL_GPU_MODEL.as_ref().and_then(|re| re.captures(gpu)) {
        let model = caps
            .name("gpu_model_number")
            .map(|m| m.as_str().trim_start_matches('P'))
            .and_then(|m| m.parse::<u32>().ok())
            .unwrap_or(0);
        if (500..=1000).contains(&model) {
            notes.push(Note::new(
                Severity::Advisory,
                "Intel iGPUs are not officially supported, visual glitches are to be expected",
            ));
        } else {
            notes.push(Note::new(
                Severity::Critical,
                "Intel iGPUs before Skylake do not fully comply with OpenGL 4.3",
            ));
            supported = false;
        }
    }

    let on_windows_like = facts.has(Field::OsPath) && !facts.is(Field::OsPath, "Linux");
    if on_windows_like && is_nvidia(gpu) {
        if let Some(driver) = facts
            .get(Field::DriverVersionInfo)
            .and_then(DottedVersion::parse)
        {
            if driver < NVIDIA_RECOMMENDED_OLD_WINDOWS_VERSION {
                notes.push(Note::new(
                    Severity::Warning,
                    format!(
                        "Please update your nVidia driver to at least {NVIDIA_RECOMMENDED_OLD_WINDOWS_VERSION}"
                    ),
                ));
            }
            if driver >= NVIDIA_FULLSCREEN_BUG_MIN_VERSION
                && driver < NVIDIA_FULLSCREEN_BUG_MAX_VERSION
                && facts.is(Field::Renderer, "Vulkan")
                && facts.is(Field::Vsync, DISABLED)
            {
                notes.push(Note::new(
                    Severity::Advisory,
                    "**400 series** nVidia drivers can cause random screen freeze when playing in **fullscreen** using **Vulkan** renderer with **vsync disabled**",
                ));
            }
        }
    }

    GpuAssessment { notes, supported }
}
