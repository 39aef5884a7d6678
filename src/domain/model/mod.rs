// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar value stored in the open game metadata map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl MetadataValue {
    /// Parse a CLI-style value, preferring the narrowest scalar type
    pub fn parse(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            return MetadataValue::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return MetadataValue::Integer(i);
        }
        if let Ok(n) = raw.parse::<f64>() {
            if n.is_finite() {
                return MetadataValue::Number(n);
            }
        }
        MetadataValue::Text(raw.to_string())
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Game identity plus free metadata (opponent, date, score, competition...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_number: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, MetadataValue>,
}

impl GameInfo {
    pub fn new(game_number: impl Into<String>) -> Self {
        Self {
            game_number: game_number.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style metadata insertion
    pub fn with_field(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// Court phase an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionSector {
    Serve,
    Reception,
    Set,
    Attack,
    Block,
    Defense,
    Game,
}

impl ActionSector {
    pub const ALL: [ActionSector; 7] = [
        ActionSector::Serve,
        ActionSector::Reception,
        ActionSector::Set,
        ActionSector::Attack,
        ActionSector::Block,
        ActionSector::Defense,
        ActionSector::Game,
    ];

    /// Faults a referee can call in this sector
    pub fn faults(&self) -> &'static [ActionFault] {
        use ActionFault::*;
        match self {
            ActionSector::Serve => &[FootFault, ServiceDelay, Screening, ServiceOrder, BallOut, NetTouch],
            ActionSector::Reception => &[DoubleContact, Catch, PositionalFault, BallOut, BallIn],
            ActionSector::Set => &[DoubleContact, Catch, NetTouch, CenterLine, BallOut],
            ActionSector::Attack => &[NetTouch, CenterLine, BackRowAttack, AttackOnServe, BallOut, BallIn, Touch],
            ActionSector::Block => &[NetTouch, ReachingBeyondNet, BackRowBlock, BlockOnServe, BallOut, BallIn, Touch],
            ActionSector::Defense => &[FourHits, DoubleContact, Catch, BallOut, BallIn, Touch],
            ActionSector::Game => &[Substitution, Timeout, Sanction, Delay, RotationFault],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSector::Serve => "SERVE",
            ActionSector::Reception => "RECEPTION",
            ActionSector::Set => "SET",
            ActionSector::Attack => "ATTACK",
            ActionSector::Block => "BLOCK",
            ActionSector::Defense => "DEFENSE",
            ActionSector::Game => "GAME",
        }
    }

    /// Parse sector name (case insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ActionSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault called on an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionFault {
    FootFault,
    ServiceDelay,
    Screening,
    ServiceOrder,
    DoubleContact,
    Catch,
    PositionalFault,
    FourHits,
    NetTouch,
    CenterLine,
    BackRowAttack,
    AttackOnServe,
    ReachingBeyondNet,
    BackRowBlock,
    BlockOnServe,
    BallOut,
    BallIn,
    Touch,
    Substitution,
    Timeout,
    Sanction,
    Delay,
    RotationFault,
}

impl ActionFault {
    pub const ALL: [ActionFault; 23] = [
        ActionFault::FootFault,
        ActionFault::ServiceDelay,
        ActionFault::Screening,
        ActionFault::ServiceOrder,
        ActionFault::DoubleContact,
        ActionFault::Catch,
        ActionFault::PositionalFault,
        ActionFault::FourHits,
        ActionFault::NetTouch,
        ActionFault::CenterLine,
        ActionFault::BackRowAttack,
        ActionFault::AttackOnServe,
        ActionFault::ReachingBeyondNet,
        ActionFault::BackRowBlock,
        ActionFault::BlockOnServe,
        ActionFault::BallOut,
        ActionFault::BallIn,
        ActionFault::Touch,
        ActionFault::Substitution,
        ActionFault::Timeout,
        ActionFault::Sanction,
        ActionFault::Delay,
        ActionFault::RotationFault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionFault::FootFault => "FOOT_FAULT",
            ActionFault::ServiceDelay => "SERVICE_DELAY",
            ActionFault::Screening => "SCREENING",
            ActionFault::ServiceOrder => "SERVICE_ORDER",
            ActionFault::DoubleContact => "DOUBLE_CONTACT",
            ActionFault::Catch => "CATCH",
            ActionFault::PositionalFault => "POSITIONAL_FAULT",
            ActionFault::FourHits => "FOUR_HITS",
            ActionFault::NetTouch => "NET_TOUCH",
            ActionFault::CenterLine => "CENTER_LINE",
            ActionFault::BackRowAttack => "BACK_ROW_ATTACK",
            ActionFault::AttackOnServe => "ATTACK_ON_SERVE",
            ActionFault::ReachingBeyondNet => "REACHING_BEYOND_NET",
            ActionFault::BackRowBlock => "BACK_ROW_BLOCK",
            ActionFault::BlockOnServe => "BLOCK_ON_SERVE",
            ActionFault::BallOut => "BALL_OUT",
            ActionFault::BallIn => "BALL_IN",
            ActionFault::Touch => "TOUCH",
            ActionFault::Substitution => "SUBSTITUTION",
            ActionFault::Timeout => "TIMEOUT",
            ActionFault::Sanction => "SANCTION",
            ActionFault::Delay => "DELAY",
            ActionFault::RotationFault => "ROTATION_FAULT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ActionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review verdict on the referee decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPrecise {
    Correct,
    Incorrect,
    Doubtful,
    NotVisible,
}

impl ActionPrecise {
    pub const ALL: [ActionPrecise; 4] = [
        ActionPrecise::Correct,
        ActionPrecise::Incorrect,
        ActionPrecise::Doubtful,
        ActionPrecise::NotVisible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPrecise::Correct => "CORRECT",
            ActionPrecise::Incorrect => "INCORRECT",
            ActionPrecise::Doubtful => "DOUBTFUL",
            ActionPrecise::NotVisible => "NOT_VISIBLE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ActionPrecise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action payload as submitted by the tagging UI, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAction {
    /// Seconds from the start of the canonical video
    pub offset: f64,
    pub sector: ActionSector,
    pub fault: ActionFault,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise: Option<ActionPrecise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl NewAction {
    pub fn new(offset: f64, sector: ActionSector, fault: ActionFault) -> Self {
        Self {
            offset,
            sector,
            fault,
            precise: None,
            comment: None,
        }
    }

    pub fn with_precise(mut self, precise: ActionPrecise) -> Self {
        self.precise = Some(precise);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A tagged action within a game's canonical video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub offset: f64,
    pub sector: ActionSector,
    pub fault: ActionFault,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise: Option<ActionPrecise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Materialize a new action under a fresh unique id
    pub fn from_new(new_action: NewAction) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            offset: new_action.offset,
            sector: new_action.sector,
            fault: new_action.fault,
            precise: new_action.precise,
            comment: new_action.comment,
            created_at: Utc::now(),
        }
    }
}

/// The durable record of one reviewed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub info: GameInfo,
    /// Canonical video file name, relative to the game folder
    pub video_file: String,
    /// Canonical video duration in seconds, when it could be probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Chronological review order
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Absolute canonical video path, resolved when the record is read
    #[serde(skip)]
    pub video_path: PathBuf,
}

impl Game {
    pub fn game_number(&self) -> &str {
        &self.info.game_number
    }

    pub fn find_action(&self, action_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == action_id)
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_number: self.info.game_number.clone(),
            info: self.info.clone(),
            action_count: self.actions.len(),
            video_duration: self.video_duration,
            created_at: self.created_at,
            disk_usage: 0,
        }
    }
}

/// Listing entry returned to the UI at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_number: String,
    pub info: GameInfo,
    pub action_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Bytes used by the game folder
    pub disk_usage: u64,
}

/// Half-open time window `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s-{:.3}s", self.start, self.end)
    }
}
