//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

use crate::capture::CaptureError;
use crate::pipeline::PipelineError;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    let error_msg = error.to_string();
    let capture = error.chain().find_map(|e| e.downcast_ref::<CaptureError>());
    let pipeline = error.chain().find_map(|e| e.downcast_ref::<PipelineError>());

    match (capture, pipeline) {
        (Some(CaptureError::PermissionDenied), _) => format_permission_error(&mut output),
        (Some(e), _) => format_camera_error(&mut output, e),
        (None, Some(PipelineError::Capture(e))) => format_camera_error(&mut output, e),
        (None, Some(_)) => format_controller_error(&mut output),
        (None, None) => {
            let lower = error_msg.to_lowercase();
            if lower.contains("permission") {
                format_permission_error(&mut output);
            } else if lower.contains("camera") {
                format_camera_generic(&mut output);
            } else if lower.contains("inference") || lower.contains("detector") {
                format_inference_error(&mut output);
            } else if lower.contains("config") {
                format_config_error(&mut output);
            } else {
                format_generic_error(&mut output, &error_msg);
            }
        }
    }

    writeln!(&mut output).ok();
    writeln!(&mut output, "{}", RULE).ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    writeln!(&mut output, "{}", RULE).ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: lamco-pose-governor -vvv"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Enable per-frame diagnostics: lamco-pose-governor --detailed-logging"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_permission_error(output: &mut String) {
    writeln!(output, "Camera Permission Error").ok();
    writeln!(output).ok();
    writeln!(output, "Access to the camera was denied.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Permission prompt was dismissed").ok();
    writeln!(output, "     → Grant camera access and start the session again").ok();
    writeln!(output).ok();
    writeln!(output, "  2. No access to the video device").ok();
    writeln!(
        output,
        "     → Add your user to video group: sudo usermod -aG video $USER"
    )
    .ok();
    writeln!(output, "     → Log out and log back in").ok();
}

fn format_camera_error(output: &mut String, error: &CaptureError) {
    match error {
        CaptureError::PermissionDenied => format_permission_error(output),
        CaptureError::Stalled(ms) => {
            writeln!(output, "Camera Stalled").ok();
            writeln!(output).ok();
            writeln!(output, "The camera delivered no frame for {}ms.", ms).ok();
            writeln!(output).ok();
            writeln!(output, "Common Causes:").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Device was unplugged or suspended").ok();
            writeln!(output, "     → Reconnect the camera and restart").ok();
            writeln!(output).ok();
            writeln!(output, "  2. Another application grabbed the device").ok();
            writeln!(output, "     → Close other camera applications").ok();
        }
        CaptureError::InvalidConfig(_) => {
            writeln!(output, "Capture Configuration Error").ok();
            writeln!(output).ok();
            writeln!(output, "The [capture] section is not usable.").ok();
            writeln!(output).ok();
            writeln!(output, "  → Frame rate, width and height must be positive").ok();
            writeln!(output, "  → Check: [capture] fps, width, height in config.toml").ok();
        }
        _ => format_camera_generic(output),
    }
}

fn format_camera_generic(output: &mut String) {
    writeln!(output, "Camera Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not receive frames from the camera.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. No camera device present").ok();
    writeln!(output, "     → Check: ls /dev/video*").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Device busy").ok();
    writeln!(output, "     → Close other camera applications").ok();
}

fn format_inference_error(output: &mut String) {
    writeln!(output, "Pose Detector Error").ok();
    writeln!(output).ok();
    writeln!(output, "The pose detector could not process frames.").ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Lower the load").ok();
    writeln!(output, "     → Reduce [controller] target_fps").ok();
    writeln!(output, "     → Keep auto_adjust_fps = true").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Check detector settings").ok();
    writeln!(output, "     → See [inference] in config.toml").ok();
}

fn format_controller_error(output: &mut String) {
    writeln!(output, "Controller Error").ok();
    writeln!(output).ok();
    writeln!(output, "The frame controller thread stopped unexpectedly.").ok();
    writeln!(output).ok();
    writeln!(output, "  → Re-run with -vvv and check the log for a panic message").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Inconsistent thresholds").ok();
    writeln!(
        output,
        "     → [device] medium thresholds must not exceed high thresholds"
    )
    .ok();
    writeln!(
        output,
        "     → [auto_tune] lower_threshold must be below raise_threshold"
    )
    .ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Pipeline Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while running the pipeline.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_error() {
        let error = anyhow::anyhow!("Failed to parse config file");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("Configuration Error"));
    }

    #[test]
    fn test_permission_error_downcast() {
        let error = anyhow::Error::new(PipelineError::Capture(CaptureError::PermissionDenied));
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Camera Permission Error"));
        assert!(formatted.contains("usermod"));
    }

    #[test]
    fn test_stalled_camera() {
        let error = anyhow::Error::new(CaptureError::Stalled(1500)).context("Capture thread failed");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("1500ms"));
    }
}
