// Vocabulary shared by the engine and the session core.
//
// Buttons, game variables, screen resolutions and formats mirror the names
// used in configuration files (`"MOVE_LEFT"`, `"AMMO2"`, `"RES_640X480"`,
// `"CRCGCB"`), so every enum here (de)serializes under those names.
//
// The record types at the bottom (`Label`, `ObjectInfo`, `SectorInfo`) are
// closed: one fixed field set per kind, rebuilt in full every tick.

use serde::{Deserialize, Serialize};

/// Player numbers are 1-based; the host (or the only player) is 1.
pub type PlayerNumber = u8;

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Button {
    Attack,
    Use,
    Jump,
    Crouch,
    Turn180,
    #[serde(rename = "ALTATTACK")]
    AltAttack,
    Reload,
    Zoom,
    Speed,
    Strafe,
    MoveRight,
    MoveLeft,
    MoveBackward,
    MoveForward,
    TurnRight,
    TurnLeft,
    LookUp,
    LookDown,
    MoveUp,
    MoveDown,
    Land,
    SelectWeapon1,
    SelectWeapon2,
    SelectWeapon3,
    SelectWeapon4,
    SelectWeapon5,
    SelectWeapon6,
    SelectWeapon7,
    SelectNextWeapon,
    SelectPrevWeapon,
    LookUpDownDelta,
    TurnLeftRightDelta,
    MoveForwardBackwardDelta,
    MoveLeftRightDelta,
    MoveUpDownDelta,
}

impl Button {
    /// Delta buttons carry a magnitude; all others are pressed iff non-zero.
    pub fn is_delta(self) -> bool {
        matches!(
            self,
            Button::LookUpDownDelta
                | Button::TurnLeftRightDelta
                | Button::MoveForwardBackwardDelta
                | Button::MoveLeftRightDelta
                | Button::MoveUpDownDelta
        )
    }
}

// ---------------------------------------------------------------------------
// Game variables
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameVariable {
    #[serde(rename = "KILLCOUNT")]
    KillCount,
    #[serde(rename = "ITEMCOUNT")]
    ItemCount,
    #[serde(rename = "FRAGCOUNT")]
    FragCount,
    #[serde(rename = "DEATHCOUNT")]
    DeathCount,
    #[serde(rename = "HITCOUNT")]
    HitCount,
    HitsTaken,
    #[serde(rename = "DAMAGECOUNT")]
    DamageCount,
    DamageTaken,
    Health,
    Armor,
    Dead,
    OnGround,
    AttackReady,
    SelectedWeapon,
    SelectedWeaponAmmo,
    Ammo0,
    Ammo1,
    Ammo2,
    Ammo3,
    Ammo4,
    Ammo5,
    Ammo6,
    Ammo7,
    Ammo8,
    Ammo9,
    PositionX,
    PositionY,
    PositionZ,
    Angle,
    Pitch,
    Roll,
    VelocityX,
    VelocityY,
    VelocityZ,
    PlayerNumber,
    PlayerCount,
    User1,
    User2,
    User3,
    User4,
}

impl GameVariable {
    /// Ammo slot for `AMMO0`..`AMMO9`.
    pub fn ammo_slot(self) -> Option<usize> {
        use GameVariable::*;
        let slot = match self {
            Ammo0 => 0,
            Ammo1 => 1,
            Ammo2 => 2,
            Ammo3 => 3,
            Ammo4 => 4,
            Ammo5 => 5,
            Ammo6 => 6,
            Ammo7 => 7,
            Ammo8 => 8,
            Ammo9 => 9,
            _ => return None,
        };
        Some(slot)
    }
}

// ---------------------------------------------------------------------------
// Screen
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenResolution {
    #[serde(rename = "RES_160X120")]
    Res160X120,
    #[default]
    #[serde(rename = "RES_320X240")]
    Res320X240,
    #[serde(rename = "RES_640X480")]
    Res640X480,
    #[serde(rename = "RES_800X600")]
    Res800X600,
    #[serde(rename = "RES_1024X768")]
    Res1024X768,
    #[serde(rename = "RES_1280X720")]
    Res1280X720,
    #[serde(rename = "RES_1920X1080")]
    Res1920X1080,
}

impl ScreenResolution {
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            ScreenResolution::Res160X120 => (160, 120),
            ScreenResolution::Res320X240 => (320, 240),
            ScreenResolution::Res640X480 => (640, 480),
            ScreenResolution::Res800X600 => (800, 600),
            ScreenResolution::Res1024X768 => (1024, 768),
            ScreenResolution::Res1280X720 => (1280, 720),
            ScreenResolution::Res1920X1080 => (1920, 1080),
        }
    }
}

/// Pixel layout of the screen and automap buffers.
///
/// `CRCGCB` and `CBCGCR` are planar (one full plane per channel); every other
/// multi-channel format is interleaved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreenFormat {
    #[default]
    Crcgcb,
    Rgb24,
    Rgba32,
    Argb32,
    Cbcgcr,
    Bgr24,
    Bgra32,
    Abgr32,
    Gray8,
    #[serde(rename = "DOOM_256_COLORS8")]
    Doom256Colors8,
}

impl ScreenFormat {
    pub fn channels(self) -> usize {
        match self {
            ScreenFormat::Crcgcb
            | ScreenFormat::Cbcgcr
            | ScreenFormat::Rgb24
            | ScreenFormat::Bgr24 => 3,
            ScreenFormat::Rgba32
            | ScreenFormat::Argb32
            | ScreenFormat::Bgra32
            | ScreenFormat::Abgr32 => 4,
            ScreenFormat::Gray8 | ScreenFormat::Doom256Colors8 => 1,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(self, ScreenFormat::Crcgcb | ScreenFormat::Cbcgcr)
    }
}

/// Cosmetic render toggles. None of these influence the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub hud: bool,
    pub minimal_hud: bool,
    pub crosshair: bool,
    pub weapon: bool,
    pub decals: bool,
    pub particles: bool,
    pub effects_sprites: bool,
    pub messages: bool,
    pub corpses: bool,
    pub screen_flashes: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            hud: true,
            minimal_hud: false,
            crosshair: false,
            weapon: true,
            decals: true,
            particles: true,
            effects_sprites: true,
            messages: true,
            corpses: true,
            screen_flashes: true,
        }
    }
}

/// Everything the renderer needs besides the world itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderRequest {
    pub resolution: ScreenResolution,
    pub format: ScreenFormat,
    pub settings: RenderSettings,
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

/// A fixed-size pixel array. Planar buffers store `channels` consecutive
/// `width * height` planes; interleaved buffers store `channels` bytes per
/// pixel in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub planar: bool,
    pub data: Vec<u8>,
}

impl Buffer {
    pub fn new(width: usize, height: usize, channels: usize, planar: bool) -> Self {
        Self {
            width,
            height,
            channels,
            planar,
            data: vec![0; width * height * channels],
        }
    }

    /// Resize in place, keeping the allocation when it is large enough.
    pub fn reshape(&mut self, width: usize, height: usize, channels: usize, planar: bool) {
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.planar = planar;
        self.data.resize(width * height * channels, 0);
    }

    /// Byte offset of channel `c` of pixel `(x, y)`.
    pub fn offset(&self, x: usize, y: usize, c: usize) -> usize {
        if self.planar {
            c * self.width * self.height + y * self.width + x
        } else {
            (y * self.width + x) * self.channels + c
        }
    }

    pub fn get(&self, x: usize, y: usize, c: usize) -> u8 {
        self.data[self.offset(x, y, c)]
    }
}

/// Destination of one render call. Only the targets that are present are
/// drawn; each is overwritten in place.
#[derive(Default)]
pub struct FrameTarget<'a> {
    pub screen: Option<&'a mut Buffer>,
    pub depth: Option<&'a mut Buffer>,
    pub labels_buffer: Option<&'a mut Buffer>,
    pub automap: Option<&'a mut Buffer>,
    pub labels: Option<&'a mut Vec<Label>>,
}

// ---------------------------------------------------------------------------
// Inputs and per-tick records
// ---------------------------------------------------------------------------

/// One player's input for one tick, in button registration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub player: PlayerNumber,
    pub buttons: Vec<f64>,
    #[serde(default)]
    pub respawn: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One object visible on screen this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub object_id: u32,
    pub object_name: String,
    /// Value marking this object's pixels in the labels buffer.
    pub value: u8,
    pub position: Vec3,
    pub angle: f64,
    pub pitch: f64,
    pub roll: f64,
    pub velocity: Vec3,
    /// Screen-space bounding box.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One object present in the level, visible or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: u32,
    pub name: String,
    pub position: Vec3,
    pub angle: f64,
    pub pitch: f64,
    pub roll: f64,
    pub velocity: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineInfo {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub is_blocking: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorInfo {
    pub floor_height: f64,
    pub ceiling_height: f64,
    pub lines: Vec<LineInfo>,
}

/// Engine-side view of one player, refreshed every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerStatus {
    pub number: PlayerNumber,
    pub name: String,
    pub color: u8,
    pub frags: i32,
    pub deaths: i32,
    pub health: f64,
    pub dead: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_config_vocabulary() {
        let b: Vec<Button> =
            serde_json::from_str(r#"["MOVE_LEFT","ATTACK","TURN_LEFT_RIGHT_DELTA"]"#).unwrap();
        assert_eq!(
            b,
            vec![Button::MoveLeft, Button::Attack, Button::TurnLeftRightDelta]
        );
        let v: Vec<GameVariable> =
            serde_json::from_str(r#"["AMMO2","FRAGCOUNT","POSITION_X","HITS_TAKEN"]"#).unwrap();
        assert_eq!(
            v,
            vec![
                GameVariable::Ammo2,
                GameVariable::FragCount,
                GameVariable::PositionX,
                GameVariable::HitsTaken
            ]
        );
        let r: ScreenResolution = serde_json::from_str(r#""RES_1280X720""#).unwrap();
        assert_eq!(r.dimensions(), (1280, 720));
        let f: ScreenFormat = serde_json::from_str(r#""DOOM_256_COLORS8""#).unwrap();
        assert_eq!(f.channels(), 1);
    }

    #[test]
    fn planar_and_interleaved_offsets() {
        let planar = Buffer::new(4, 2, 3, true);
        assert_eq!(planar.offset(1, 1, 2), 2 * 8 + 4 + 1);
        let packed = Buffer::new(4, 2, 3, false);
        assert_eq!(packed.offset(1, 1, 2), (4 + 1) * 3 + 2);
    }

    #[test]
    fn reshape_keeps_capacity() {
        let mut buf = Buffer::new(8, 8, 4, false);
        let cap = buf.data.capacity();
        buf.reshape(4, 4, 1, false);
        assert_eq!(buf.data.len(), 16);
        assert_eq!(buf.data.capacity(), cap);
    }
}
