/// Requests to the host's transport. The host decides whether and when to follow them;
/// the result shows up later through the play head.
pub trait PlaybackController {
    fn request_set_playback_position(&self, time_in_seconds: f64);
    fn request_start_playback(&self);
    fn request_stop_playback(&self);
}
