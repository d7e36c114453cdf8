//! Go-live decision logic
//!
//! Pure checks over a snapshot of the dashboard state. The controller turns
//! a rejection into a notice; nothing here has side effects.

use crate::error::StreamError;
use crate::protocol::{Notice, PlatformKey};

/// Snapshot consulted before going live
#[derive(Debug, Clone, Copy)]
pub struct StartInputs<'a> {
    /// The source list has an active camera or display
    pub listed_video: bool,
    /// The registry holds a live video track
    pub registered_video: bool,
    pub has_audio: bool,
    pub keys: &'a [PlatformKey],
    pub broadcast_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartWarning {
    NoAudio,
}

impl StartWarning {
    pub fn notice(self) -> Notice {
        match self {
            Self::NoAudio => Notice::warning(
                "No Audio Source",
                "You are going live without an active audio source. Viewers will not hear you.",
            ),
        }
    }
}

/// Checks passed; the stream may proceed to the relay probe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartPlan {
    pub warnings: Vec<StartWarning>,
}

fn has_video(inputs: &StartInputs<'_>) -> bool {
    inputs.listed_video && inputs.registered_video
}

/// Advisory findings reached before any hard check after video.
///
/// Empty when the video check fails, since nothing past it runs.
pub fn start_warnings(inputs: &StartInputs<'_>) -> Vec<StartWarning> {
    let mut warnings = Vec::new();
    if has_video(inputs) && !inputs.has_audio {
        warnings.push(StartWarning::NoAudio);
    }
    warnings
}

/// Run the local go-live checks in order: video, audio (advisory),
/// stream keys, broadcast stream
pub fn check_start(inputs: &StartInputs<'_>) -> Result<StartPlan, StreamError> {
    if !has_video(inputs) {
        return Err(StreamError::NoVideoSource);
    }

    let plan = StartPlan {
        warnings: start_warnings(inputs),
    };

    if !inputs.keys.iter().any(PlatformKey::has_key) {
        return Err(StreamError::NoStreamKeys);
    }

    if !inputs.broadcast_ready {
        return Err(StreamError::NoBroadcastStream);
    }

    Ok(plan)
}

/// Checks for a dry run: a video source and at least one configured key
pub fn check_test(
    listed_video: bool,
    registered_video: bool,
    keys: &[PlatformKey],
) -> Result<(), StreamError> {
    if !listed_video || !registered_video {
        return Err(StreamError::NoVideoSource);
    }
    if keys.is_empty() {
        return Err(StreamError::NoStreamKeys);
    }
    Ok(())
}

/// Destructive notice describing why a lifecycle request was refused
pub fn rejection_notice(err: &StreamError) -> Notice {
    match err {
        StreamError::NoVideoSource => Notice::destructive(
            "No Video Source",
            "Activate a camera or screen share before going live.",
        ),
        StreamError::NoStreamKeys => Notice::destructive(
            "No Stream Keys Found",
            "Add a stream key for at least one platform in Settings.",
        ),
        StreamError::NoBroadcastStream => Notice::destructive(
            "Stream Not Ready",
            "The broadcast stream has not been prepared yet. Open the preview and try again.",
        ),
        StreamError::RelayUnavailable => Notice::destructive(
            "Relay Server Unavailable",
            "Could not reach the relay server. Check that it is running and try again.",
        ),
        StreamError::RelayRejected(reason) => Notice::destructive("Relay Error", reason.clone()),
        StreamError::StorageRead(reason) => Notice::destructive(
            "Could Not Read Stream Keys",
            format!("Saved stream keys are unreadable: {}", reason),
        ),
        StreamError::InvalidTransition { from, to } => Notice::destructive(
            "Action Not Available",
            format!("Cannot switch from {} to {}.", from, to),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<PlatformKey> {
        vec![PlatformKey::new("twitch", "rtmp://live.twitch.tv/app", "live_123")]
    }

    fn ready(keys: &[PlatformKey]) -> StartInputs<'_> {
        StartInputs {
            listed_video: true,
            registered_video: true,
            has_audio: true,
            keys,
            broadcast_ready: true,
        }
    }

    #[test]
    fn test_all_checks_pass() {
        let keys = keys();
        assert_eq!(check_start(&ready(&keys)).unwrap(), StartPlan::default());
    }

    #[test]
    fn test_video_needs_both_views() {
        let keys = keys();
        let mut inputs = ready(&keys);
        inputs.registered_video = false;
        assert_eq!(check_start(&inputs), Err(StreamError::NoVideoSource));

        let mut inputs = ready(&keys);
        inputs.listed_video = false;
        assert_eq!(check_start(&inputs), Err(StreamError::NoVideoSource));
    }

    #[test]
    fn test_missing_audio_only_warns() {
        let keys = keys();
        let mut inputs = ready(&keys);
        inputs.has_audio = false;
        let plan = check_start(&inputs).unwrap();
        assert_eq!(plan.warnings, vec![StartWarning::NoAudio]);
    }

    #[test]
    fn test_audio_warning_independent_of_later_checks() {
        let mut inputs = ready(&[]);
        inputs.has_audio = false;
        assert_eq!(start_warnings(&inputs), vec![StartWarning::NoAudio]);
        assert_eq!(check_start(&inputs), Err(StreamError::NoStreamKeys));

        inputs.listed_video = false;
        assert!(start_warnings(&inputs).is_empty());
    }

    #[test]
    fn test_blank_keys_rejected() {
        let blank = vec![PlatformKey::new("twitch", "rtmp://live.twitch.tv/app", "  ")];
        assert_eq!(check_start(&ready(&blank)), Err(StreamError::NoStreamKeys));
        assert_eq!(check_start(&ready(&[])), Err(StreamError::NoStreamKeys));
        assert_eq!(
            rejection_notice(&StreamError::NoStreamKeys).title,
            "No Stream Keys Found"
        );
    }

    #[test]
    fn test_check_order() {
        // Video is checked before keys, keys before the broadcast stream
        let inputs = StartInputs {
            listed_video: false,
            registered_video: false,
            has_audio: false,
            keys: &[],
            broadcast_ready: false,
        };
        assert_eq!(check_start(&inputs), Err(StreamError::NoVideoSource));

        let inputs = StartInputs {
            listed_video: true,
            registered_video: true,
            ..inputs
        };
        assert_eq!(check_start(&inputs), Err(StreamError::NoStreamKeys));

        let keys = keys();
        let inputs = StartInputs { keys: &keys, ..inputs };
        assert_eq!(check_start(&inputs), Err(StreamError::NoBroadcastStream));
    }

    #[test]
    fn test_dry_run_checks() {
        assert_eq!(check_test(true, false, &keys()), Err(StreamError::NoVideoSource));
        assert_eq!(check_test(true, true, &[]), Err(StreamError::NoStreamKeys));
        assert!(check_test(true, true, &keys()).is_ok());
    }
}
