//! Method-name translation between server generations.
//!
//! The two supported server families disagree on one piece of
//! vocabulary: the older TmForever servers call a map a "Challenge".
//! The client API uses the ManiaPlanet spelling everywhere; when
//! connected to a TmForever server, outgoing method names are rewritten
//! transparently. Event names are never touched here - the dispatcher
//! normalizes those on the inbound path.

use std::borrow::Cow;

/// Supported dedicated-server generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameVersion {
    /// TmForever / TmNations dedicated server ("Challenge" vocabulary).
    TmForever,
    /// ManiaPlanet / TM2 dedicated server ("Map" vocabulary).
    #[default]
    ManiaPlanet,
}

/// Canonical (ManiaPlanet) method name → TmForever spelling.
const METHOD_TABLE: &[(&str, &str)] = &[
    ("GetCurrentMapInfo", "GetCurrentChallengeInfo"),
    ("GetNextMapInfo", "GetNextChallengeInfo"),
    ("GetMapInfo", "GetChallengeInfo"),
    ("GetMapList", "GetChallengeList"),
    ("AddMap", "AddChallenge"),
    ("AddMapList", "AddChallengeList"),
    ("RemoveMap", "RemoveChallenge"),
    ("RemoveMapList", "RemoveChallengeList"),
    ("InsertMap", "InsertChallenge"),
    ("InsertMapList", "InsertChallengeList"),
    ("ChooseNextMap", "ChooseNextChallenge"),
    ("ChooseNextMapList", "ChooseNextChallengeList"),
    ("SetNextMapIndex", "SetNextChallengeIndex"),
    ("GetNextMapIndex", "GetNextChallengeIndex"),
    ("JumpToMapIndex", "JumpToChallengeIndex"),
    ("NextMap", "NextChallenge"),
    ("RestartMap", "RestartChallenge"),
    ("GetCurrentMapIndex", "GetCurrentChallengeIndex"),
];

/// Rewrite a canonical method name into the connected generation's
/// vocabulary. Names outside the table pass through untouched.
pub fn translate_method(method: &str, version: GameVersion) -> Cow<'_, str> {
    match version {
        GameVersion::ManiaPlanet => Cow::Borrowed(method),
        GameVersion::TmForever => METHOD_TABLE
            .iter()
            .find(|(canonical, _)| *canonical == method)
            .map(|(_, legacy)| Cow::Borrowed(*legacy))
            .unwrap_or(Cow::Borrowed(method)),
    }
}
