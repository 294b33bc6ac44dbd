pub mod playback;

/// Why playback stopped; decides the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TrackEnded,
    UserQuit,
}

impl ExitReason {
    /// Distinguishes a deliberate quit from the song running out.
    pub const USER_QUIT_CODE: u8 = 42;

    pub const fn exit_code(self) -> u8 {
        match self {
            Self::TrackEnded => 0,
            Self::UserQuit => Self::USER_QUIT_CODE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAction {
    None,
    SetTitle(String),
    Exit(ExitReason),
}
