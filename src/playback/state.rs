// Embedded player lifecycle
//
// Unstarted -> (Cued) -> Buffering -> Playing <-> Paused -> Ended

/// Lifecycle states reported by the embedded player, with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

/// Side effect the controller performs when a state is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEffect {
    /// Mark playing and start the time tracking loop
    StartPolling,
    /// Mark not playing and tear the time tracking loop down
    StopPolling,
    /// Issue a delayed play command; cued videos otherwise sit idle
    NudgePlay,
    Nothing,
}

impl PlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(PlayerState::Unstarted),
            0 => Some(PlayerState::Ended),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            3 => Some(PlayerState::Buffering),
            5 => Some(PlayerState::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
        }
    }

    /// What entering `self` requires of the controller.
    pub fn on_enter(self) -> StateEffect {
        match self {
            PlayerState::Playing => StateEffect::StartPolling,
            PlayerState::Paused | PlayerState::Ended | PlayerState::Unstarted => {
                StateEffect::StopPolling
            }
            PlayerState::Cued => StateEffect::NudgePlay,
            PlayerState::Buffering => StateEffect::Nothing,
        }
    }
}
