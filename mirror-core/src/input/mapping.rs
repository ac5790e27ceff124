//! Fixed tables from the host's native controls to snapshot fields.

use crate::input::state::{Buttons, StickAxis};

// ── NativeButton ─────────────────────────────────────────────────

/// Canonical buttons known to the host input abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NativeButton {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    L,
    R,
    Start,
    Select,
    Debug,
    Gpio14,
    ZL,
    ZR,
    Home,
}

impl NativeButton {
    /// Number of canonical buttons, mapped or not.
    pub const COUNT: usize = 17;

    /// Every canonical button in table order.
    pub const ALL: [NativeButton; Self::COUNT] = [
        NativeButton::A,
        NativeButton::B,
        NativeButton::X,
        NativeButton::Y,
        NativeButton::Up,
        NativeButton::Down,
        NativeButton::Left,
        NativeButton::Right,
        NativeButton::L,
        NativeButton::R,
        NativeButton::Start,
        NativeButton::Select,
        NativeButton::Debug,
        NativeButton::Gpio14,
        NativeButton::ZL,
        NativeButton::ZR,
        NativeButton::Home,
    ];

    /// Stable lowercase name used in device parameters.
    pub const fn name(self) -> &'static str {
        match self {
            NativeButton::A => "a",
            NativeButton::B => "b",
            NativeButton::X => "x",
            NativeButton::Y => "y",
            NativeButton::Up => "up",
            NativeButton::Down => "down",
            NativeButton::Left => "left",
            NativeButton::Right => "right",
            NativeButton::L => "l",
            NativeButton::R => "r",
            NativeButton::Start => "start",
            NativeButton::Select => "select",
            NativeButton::Debug => "debug",
            NativeButton::Gpio14 => "gpio14",
            NativeButton::ZL => "zl",
            NativeButton::ZR => "zr",
            NativeButton::Home => "home",
        }
    }

    /// Reverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Snapshot flag this button reads, or `None` when it is not wired.
    pub fn mapping(self) -> Option<Buttons> {
        BUTTON_MAPPING[self as usize]
    }
}

/// One entry per [`NativeButton`], indexed by discriminant.
///
/// Debug, GPIO14 and Home have no counterpart on the remote pad.
const BUTTON_MAPPING: [Option<Buttons>; NativeButton::COUNT] = [
    Some(Buttons::A),
    Some(Buttons::B),
    Some(Buttons::X),
    Some(Buttons::Y),
    Some(Buttons::D_UP),
    Some(Buttons::D_DOWN),
    Some(Buttons::D_LEFT),
    Some(Buttons::D_RIGHT),
    Some(Buttons::L),
    Some(Buttons::R),
    Some(Buttons::PLUS),
    Some(Buttons::MINUS),
    None,
    None,
    Some(Buttons::ZL),
    Some(Buttons::ZR),
    None,
];

// ── NativeAnalog ─────────────────────────────────────────────────

/// Canonical analog sticks known to the host input abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NativeAnalog {
    /// Primary stick.
    CirclePad,
    /// Secondary stick.
    CStick,
}

impl NativeAnalog {
    pub const COUNT: usize = 2;

    pub const ALL: [NativeAnalog; Self::COUNT] = [NativeAnalog::CirclePad, NativeAnalog::CStick];

    pub const fn name(self) -> &'static str {
        match self {
            NativeAnalog::CirclePad => "circle_pad",
            NativeAnalog::CStick => "c_stick",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// The `(x, y)` axis pair this stick reads.
    pub fn mapping(self) -> (StickAxis, StickAxis) {
        ANALOG_MAPPING[self as usize]
    }
}

const ANALOG_MAPPING: [(StickAxis, StickAxis); NativeAnalog::COUNT] = [
    (StickAxis::LeftX, StickAxis::LeftY),
    (StickAxis::RightX, StickAxis::RightY),
];

// ── Tests ────────────────────────────────────────────────────────
