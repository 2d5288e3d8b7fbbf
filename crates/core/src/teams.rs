//! Team natives
//!
//! Six natives over the engine's team entities: count, name, score
//! read/write, roster size, and the entity reference. All of them share one
//! validation precondition: the team index must be in range and the slot
//! must hold a live team, otherwise the call aborts with the invalid-index
//! error and has no side effects.
//!
//! The score field's offset is resolved once per process through
//! [`PropField`] and reused for every team regardless of class.

use std::sync::Arc;

use sourcerust_engine::{GameConfig, GameHelpers, GameSession, TeamRecord};
use sourcerust_sdk::Cell;

use crate::natives::{NativeError, NativeRegistry, NativeResult, PluginContext};
use crate::props::{PropError, PropField};

/// Gamedata key for the team score field.
const SCORE_KEY: &str = "m_iScore";

/// The engine registers the team roster array under a quoted name.
const PLAYER_ARRAY_PROP: &str = "\"player_array\"";

/// The team query/mutation natives and their injected services.
pub struct TeamNatives {
    helpers: Arc<dyn GameHelpers>,
    session: Arc<dyn GameSession>,
    gameconf: Arc<dyn GameConfig>,
    score: PropField<i32>,
}

impl TeamNatives {
    pub fn new(
        helpers: Arc<dyn GameHelpers>,
        session: Arc<dyn GameSession>,
        gameconf: Arc<dyn GameConfig>,
    ) -> Self {
        Self {
            helpers,
            session,
            gameconf,
            score: PropField::new(SCORE_KEY),
        }
    }

    /// Shared validation: the index must be in range and the slot live.
    fn valid_team(&self, teamindex: Cell) -> Result<(TeamRecord, String), NativeError> {
        let index =
            usize::try_from(teamindex).map_err(|_| NativeError::InvalidTeamIndex(teamindex))?;
        let record = self
            .helpers
            .team(index)
            .ok_or(NativeError::InvalidTeamIndex(teamindex))?;
        match record.class_name.clone() {
            Some(class_name) => Ok((record, class_name)),
            None => Err(NativeError::InvalidTeamIndex(teamindex)),
        }
    }

    /// `GetTeamCount()` - current size of the team collection. Never fails.
    pub fn get_team_count(&self, _ctx: &mut dyn PluginContext, params: &[Cell]) -> NativeResult {
        let [] = params else {
            return Err(bad_arity(0, params));
        };
        Ok(self.helpers.team_count() as Cell)
    }

    /// `GetTeamName(index, buffer, maxlen)` - copy the team's name into the
    /// caller's buffer, truncated to `maxlen`.
    pub fn get_team_name(&self, ctx: &mut dyn PluginContext, params: &[Cell]) -> NativeResult {
        let &[teamindex, buffer, maxlen] = params else {
            return Err(bad_arity(3, params));
        };
        self.valid_team(teamindex)?;

        if self.helpers.teamname_offset() == 0 {
            return Err(NativeError::TeamNamesUnavailable);
        }
        let name = self
            .helpers
            .team_name(teamindex as usize)
            .ok_or(NativeError::TeamNamesUnavailable)?;

        let max_bytes = usize::try_from(maxlen).unwrap_or(0);
        ctx.string_to_local_utf8(buffer, max_bytes, &name)?;

        Ok(1)
    }

    /// `GetTeamScore(index)` - read the team's score field.
    pub fn get_team_score(&self, _ctx: &mut dyn PluginContext, params: &[Cell]) -> NativeResult {
        let &[teamindex] = params else {
            return Err(bad_arity(1, params));
        };
        let (record, class_name) = self.valid_team(teamindex)?;

        self.score
            .resolve(&*self.gameconf, &*self.helpers, &class_name)?;

        // SAFETY: the offset came from a team class's own property table and
        // the record's entity is live while the engine keeps it registered.
        let value = unsafe { self.score.read(record.entity) };
        Ok(value)
    }

    /// `SetTeamScore(index, value)` - write the team's score field and
    /// flag the change for replication. Requires a running map.
    pub fn set_team_score(&self, _ctx: &mut dyn PluginContext, params: &[Cell]) -> NativeResult {
        let &[teamindex, value] = params else {
            return Err(bad_arity(2, params));
        };
        if !self.session.is_map_running() {
            return Err(NativeError::NoMapRunning);
        }
        let (record, class_name) = self.valid_team(teamindex)?;

        let offset = self
            .score
            .resolve(&*self.gameconf, &*self.helpers, &class_name)?;

        // SAFETY: same invariants as the read path; natives run serialized
        // on the game thread, so the write is exclusive.
        unsafe {
            self.score.write(record.entity, value);
        }
        self.helpers.notify_state_changed(record.entity, offset as u32);

        Ok(1)
    }

    /// `GetTeamClientCount(index)` - number of clients on the team, via the
    /// roster array's length callback.
    pub fn get_team_client_count(
        &self,
        _ctx: &mut dyn PluginContext,
        params: &[Cell],
    ) -> NativeResult {
        let &[teamindex] = params else {
            return Err(bad_arity(1, params));
        };
        let (record, class_name) = self.valid_team(teamindex)?;

        let info = self
            .helpers
            .find_in_send_table(&class_name, PLAYER_ARRAY_PROP)
            .ok_or(PropError::PropNotFound("player_array"))?;
        let proxy = info
            .array_length_proxy
            .ok_or(NativeError::ArrayLengthUnavailable)?;

        // SAFETY: the callback came from the class's own property table and
        // expects the owning object.
        let count = unsafe { proxy(record.entity, 0) };
        Ok(count as Cell)
    }

    /// `GetTeamEntity(index)` - backward-compatible entity reference for the
    /// team object.
    pub fn get_team_entity(&self, _ctx: &mut dyn PluginContext, params: &[Cell]) -> NativeResult {
        let &[teamindex] = params else {
            return Err(bad_arity(1, params));
        };
        let (record, _) = self.valid_team(teamindex)?;
        Ok(self.helpers.entity_to_bcompat_ref(record.entity))
    }
}

fn bad_arity(expected: usize, params: &[Cell]) -> NativeError {
    NativeError::BadParameterCount {
        expected,
        got: params.len(),
    }
}

/// Expose the team natives to the VM under their script-facing names.
pub fn register_team_natives(registry: &mut NativeRegistry, natives: Arc<TeamNatives>) {
    let n = Arc::clone(&natives);
    registry.register("GetTeamCount", Box::new(move |ctx, p| n.get_team_count(ctx, p)));
    let n = Arc::clone(&natives);
    registry.register("GetTeamName", Box::new(move |ctx, p| n.get_team_name(ctx, p)));
    let n = Arc::clone(&natives);
    registry.register("GetTeamScore", Box::new(move |ctx, p| n.get_team_score(ctx, p)));
    let n = Arc::clone(&natives);
    registry.register("SetTeamScore", Box::new(move |ctx, p| n.set_team_score(ctx, p)));
    let n = Arc::clone(&natives);
    registry.register(
        "GetTeamClientCount",
        Box::new(move |ctx, p| n.get_team_client_count(ctx, p)),
    );
    registry.register(
        "GetTeamEntity",
        Box::new(move |ctx, p| natives.get_team_entity(ctx, p)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::ffi::{c_int, c_void};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use sourcerust_engine::PropInfo;

    use crate::natives::truncate_utf8;

    /// Engine-side team object stand-in.
    #[repr(C)]
    struct FakeTeam {
        _pad: [u8; 0x20],
        score: i32,
        client_count: i32,
    }

    impl FakeTeam {
        fn new() -> Box<Self> {
            Box::new(Self {
                _pad: [0; 0x20],
                score: 0,
                client_count: 0,
            })
        }
    }

    unsafe extern "C" fn player_array_len(instance: *const c_void, _object_id: c_int) -> c_int {
        (*(instance as *const FakeTeam)).client_count
    }

    struct MockHelpers {
        teams: Vec<TeamRecord>,
        names: HashMap<usize, String>,
        props: HashMap<(String, String), PropInfo>,
        teamname_offset: i32,
        searches: AtomicUsize,
        state_changes: Mutex<Vec<(usize, u32)>>,
        bcompat_ref: Cell,
    }

    // SAFETY: the raw pointers inside `teams` point at Boxes owned by the
    // test fixture, which outlives every native call made through them.
    unsafe impl Send for MockHelpers {}
    unsafe impl Sync for MockHelpers {}

    impl GameHelpers for MockHelpers {
        fn team_count(&self) -> usize {
            self.teams.len()
        }
        fn team(&self, index: usize) -> Option<TeamRecord> {
            self.teams.get(index).cloned()
        }
        fn teamname_offset(&self) -> i32 {
            self.teamname_offset
        }
        fn team_name(&self, index: usize) -> Option<String> {
            self.names.get(&index).cloned()
        }
        fn find_in_send_table(&self, class_name: &str, prop_name: &str) -> Option<PropInfo> {
            self.searches.fetch_add(1, Ordering::Relaxed);
            self.props
                .get(&(class_name.to_string(), prop_name.to_string()))
                .copied()
        }
        fn notify_state_changed(&self, entity: *mut c_void, offset: u32) {
            self.state_changes
                .lock()
                .unwrap()
                .push((entity as usize, offset));
        }
        fn entity_to_bcompat_ref(&self, _entity: *mut c_void) -> Cell {
            self.bcompat_ref
        }
    }

    struct MockSession {
        running: AtomicBool,
    }

    impl GameSession for MockSession {
        fn is_map_running(&self) -> bool {
            self.running.load(Ordering::Relaxed)
        }
    }

    struct MockConfig {
        keys: HashMap<String, String>,
    }

    impl GameConfig for MockConfig {
        fn key_value(&self, key: &str) -> Option<String> {
            self.keys.get(key).cloned()
        }
    }

    /// Plugin-local memory as addressable byte buffers.
    struct MockContext {
        buffers: HashMap<Cell, Vec<u8>>,
    }

    impl MockContext {
        fn with_buffer(addr: Cell, len: usize) -> Self {
            Self {
                buffers: HashMap::from([(addr, vec![0xAA; len])]),
            }
        }

        fn buffer(&self, addr: Cell) -> &[u8] {
            &self.buffers[&addr]
        }
    }

    impl PluginContext for MockContext {
        fn string_to_local_utf8(
            &mut self,
            local_addr: Cell,
            max_bytes: usize,
            source: &str,
        ) -> Result<usize, NativeError> {
            let buf = self
                .buffers
                .get_mut(&local_addr)
                .ok_or(NativeError::InvalidLocalAddress(local_addr))?;
            let limit = max_bytes.min(buf.len());
            if limit == 0 {
                return Ok(0);
            }
            let truncated = truncate_utf8(source, limit - 1);
            buf[..truncated.len()].copy_from_slice(truncated.as_bytes());
            buf[truncated.len()] = 0;
            Ok(truncated.len())
        }
    }

    const SCORE_OFFSET: i32 = std::mem::offset_of!(FakeTeam, score) as i32;
    const BCOMPAT_REF: Cell = 777;

    /// Helpers with no names, no notifications of interest, and the given
    /// prop table.
    fn bare_helpers(
        teams: Vec<TeamRecord>,
        props: HashMap<(String, String), PropInfo>,
        teamname_offset: i32,
    ) -> MockHelpers {
        MockHelpers {
            teams,
            names: HashMap::new(),
            props,
            teamname_offset,
            searches: AtomicUsize::new(0),
            state_changes: Mutex::new(Vec::new()),
            bcompat_ref: 0,
        }
    }

    /// Teams [unused, CTeam] with a resolvable score prop and roster array.
    struct Fixture {
        natives: TeamNatives,
        helpers: Arc<MockHelpers>,
        session: Arc<MockSession>,
        team: Box<FakeTeam>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut team = FakeTeam::new();
            let entity = &mut *team as *mut FakeTeam as *mut c_void;

            let props = HashMap::from([
                (
                    ("CTeam".to_string(), "m_iScore".to_string()),
                    PropInfo {
                        offset: SCORE_OFFSET,
                        array_length_proxy: None,
                    },
                ),
                (
                    ("CTeam".to_string(), PLAYER_ARRAY_PROP.to_string()),
                    PropInfo {
                        offset: 0,
                        array_length_proxy: Some(
                            player_array_len as sourcerust_sdk::ArrayLengthSendProxyFn,
                        ),
                    },
                ),
            ]);

            let helpers = Arc::new(MockHelpers {
                teams: vec![
                    TeamRecord::unused(),
                    TeamRecord {
                        class_name: Some("CTeam".into()),
                        entity,
                    },
                ],
                names: HashMap::from([(1, "Blue Team".to_string())]),
                props,
                teamname_offset: 0x1c0,
                searches: AtomicUsize::new(0),
                state_changes: Mutex::new(Vec::new()),
                bcompat_ref: BCOMPAT_REF,
            });
            let session = Arc::new(MockSession {
                running: AtomicBool::new(true),
            });
            let gameconf = Arc::new(MockConfig {
                keys: HashMap::from([("m_iScore".to_string(), "m_iScore".to_string())]),
            });

            let natives = TeamNatives::new(
                helpers.clone() as Arc<dyn GameHelpers>,
                session.clone() as Arc<dyn GameSession>,
                gameconf,
            );

            Self {
                natives,
                helpers,
                session,
                team,
            }
        }
    }

    fn noop_ctx() -> MockContext {
        MockContext {
            buffers: HashMap::new(),
        }
    }

    #[test]
    fn test_count() {
        let f = Fixture::new();
        assert_eq!(f.natives.get_team_count(&mut noop_ctx(), &[]), Ok(2));
    }

    #[test]
    fn test_invalid_index_on_every_operation() {
        let f = Fixture::new();
        let mut ctx = MockContext::with_buffer(0x100, 32);

        // 0 = unused slot, 5 = out of range, -1 = negative
        for bad in [0, 5, -1] {
            let expected = Err(NativeError::InvalidTeamIndex(bad));
            assert_eq!(f.natives.get_team_score(&mut ctx, &[bad]), expected);
            assert_eq!(f.natives.set_team_score(&mut ctx, &[bad, 9]), expected);
            assert_eq!(
                f.natives.get_team_name(&mut ctx, &[bad, 0x100, 32]),
                expected
            );
            assert_eq!(f.natives.get_team_client_count(&mut ctx, &[bad]), expected);
            assert_eq!(f.natives.get_team_entity(&mut ctx, &[bad]), expected);
        }

        // No mutation leaked from the rejected calls
        assert_eq!(f.team.score, 0);
        assert!(f.helpers.state_changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_index_message() {
        let f = Fixture::new();
        let err = f
            .natives
            .get_team_score(&mut noop_ctx(), &[5])
            .unwrap_err();
        assert_eq!(err.to_string(), "Team index 5 is invalid");
    }

    #[test]
    fn test_score_round_trip_and_notification() {
        let f = Fixture::new();
        let mut ctx = noop_ctx();

        assert_eq!(f.natives.set_team_score(&mut ctx, &[1, 42]), Ok(1));
        assert_eq!(f.natives.get_team_score(&mut ctx, &[1]), Ok(42));
        assert_eq!(f.team.score, 42);

        let changes = f.helpers.state_changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].1, SCORE_OFFSET as u32);
    }

    #[test]
    fn test_score_offset_resolved_once() {
        let f = Fixture::new();
        let mut ctx = noop_ctx();

        f.natives.get_team_score(&mut ctx, &[1]).unwrap();
        f.natives.get_team_score(&mut ctx, &[1]).unwrap();
        f.natives.set_team_score(&mut ctx, &[1, 3]).unwrap();

        assert_eq!(f.helpers.searches.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_set_score_requires_running_map() {
        let f = Fixture::new();
        f.session.running.store(false, Ordering::Relaxed);

        let err = f
            .natives
            .set_team_score(&mut noop_ctx(), &[1, 42])
            .unwrap_err();
        assert_eq!(err, NativeError::NoMapRunning);
        assert_eq!(
            err.to_string(),
            "Cannot set team score when no map is running"
        );

        // Nothing was written, nothing was flagged
        assert_eq!(f.team.score, 0);
        assert!(f.helpers.state_changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_score_key_not_configured() {
        let mut f = Fixture::new();
        let gameconf = Arc::new(MockConfig {
            keys: HashMap::new(),
        });
        f.natives = TeamNatives::new(
            f.helpers.clone() as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            gameconf,
        );

        let err = f
            .natives
            .get_team_score(&mut noop_ctx(), &[1])
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to get m_iScore key");
    }

    #[test]
    fn test_score_prop_not_found() {
        let f = Fixture::new();
        let helpers = bare_helpers(f.helpers.teams.clone(), HashMap::new(), 0);
        let natives = TeamNatives::new(
            Arc::new(helpers) as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            Arc::new(MockConfig {
                keys: HashMap::from([("m_iScore".to_string(), "m_iScore".to_string())]),
            }),
        );

        let err = natives.get_team_score(&mut noop_ctx(), &[1]).unwrap_err();
        assert_eq!(err.to_string(), "Failed to get m_iScore prop");
    }

    #[test]
    fn test_get_name_copies_into_buffer() {
        let f = Fixture::new();
        let mut ctx = MockContext::with_buffer(0x100, 32);

        assert_eq!(f.natives.get_team_name(&mut ctx, &[1, 0x100, 32]), Ok(1));

        let buf = ctx.buffer(0x100);
        assert_eq!(&buf[..9], b"Blue Team");
        assert_eq!(buf[9], 0);
    }

    #[test]
    fn test_get_name_truncates_to_maxlen() {
        let f = Fixture::new();
        let mut ctx = MockContext::with_buffer(0x100, 32);

        assert_eq!(f.natives.get_team_name(&mut ctx, &[1, 0x100, 5]), Ok(1));

        let buf = ctx.buffer(0x100);
        assert_eq!(&buf[..4], b"Blue");
        assert_eq!(buf[4], 0);
        // Bytes past maxlen were never touched
        assert!(buf[5..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_get_name_without_capability() {
        let f = Fixture::new();
        let helpers = Arc::new(bare_helpers(
            f.helpers.teams.clone(),
            f.helpers.props.clone(),
            0,
        ));
        let natives = TeamNatives::new(
            helpers as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            Arc::new(MockConfig {
                keys: HashMap::new(),
            }),
        );

        let mut ctx = MockContext::with_buffer(0x100, 32);
        // Valid index, but the game has no team names
        let err = natives
            .get_team_name(&mut ctx, &[1, 0x100, 32])
            .unwrap_err();
        assert_eq!(err, NativeError::TeamNamesUnavailable);
        assert!(ctx.buffer(0x100).iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_client_count_uses_length_proxy() {
        let mut f = Fixture::new();
        f.team.client_count = 12;
        assert_eq!(
            f.natives.get_team_client_count(&mut noop_ctx(), &[1]),
            Ok(12)
        );
    }

    #[test]
    fn test_client_count_missing_prop_is_checked() {
        let f = Fixture::new();
        let helpers = Arc::new(bare_helpers(f.helpers.teams.clone(), HashMap::new(), 0));
        let natives = TeamNatives::new(
            helpers as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            Arc::new(MockConfig {
                keys: HashMap::new(),
            }),
        );

        let err = natives
            .get_team_client_count(&mut noop_ctx(), &[1])
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to get player_array prop");
    }

    #[test]
    fn test_client_count_missing_proxy_is_checked() {
        let f = Fixture::new();
        let mut props = f.helpers.props.clone();
        props.insert(
            ("CTeam".to_string(), PLAYER_ARRAY_PROP.to_string()),
            PropInfo {
                offset: 0,
                array_length_proxy: None,
            },
        );
        let helpers = Arc::new(bare_helpers(f.helpers.teams.clone(), props, 0));
        let natives = TeamNatives::new(
            helpers as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            Arc::new(MockConfig {
                keys: HashMap::new(),
            }),
        );

        let err = natives
            .get_team_client_count(&mut noop_ctx(), &[1])
            .unwrap_err();
        assert_eq!(err, NativeError::ArrayLengthUnavailable);
    }

    #[test]
    fn test_entity_ref() {
        let f = Fixture::new();
        assert_eq!(
            f.natives.get_team_entity(&mut noop_ctx(), &[1]),
            Ok(BCOMPAT_REF)
        );
    }

    #[test]
    fn test_bad_arity() {
        let f = Fixture::new();
        let err = f.natives.get_team_score(&mut noop_ctx(), &[]).unwrap_err();
        assert_eq!(
            err,
            NativeError::BadParameterCount {
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn test_registration_and_dispatch() {
        let f = Fixture::new();
        let natives = Arc::new(TeamNatives::new(
            f.helpers.clone() as Arc<dyn GameHelpers>,
            f.session.clone() as Arc<dyn GameSession>,
            Arc::new(MockConfig {
                keys: HashMap::from([("m_iScore".to_string(), "m_iScore".to_string())]),
            }),
        ));

        let mut registry = NativeRegistry::new();
        register_team_natives(&mut registry, natives);
        assert_eq!(registry.len(), 6);

        let mut ctx = noop_ctx();
        assert_eq!(registry.dispatch("GetTeamCount", &mut ctx, &[]), Ok(2));
        assert_eq!(registry.dispatch("SetTeamScore", &mut ctx, &[1, 9]), Ok(1));
        assert_eq!(registry.dispatch("GetTeamScore", &mut ctx, &[1]), Ok(9));
        assert_eq!(
            registry.dispatch("GetTeamPing", &mut ctx, &[1]),
            Err(NativeError::UnknownNative("GetTeamPing".into()))
        );
    }

    /// The end-to-end scenario from the natives' documented contract:
    /// an unused slot, a live CTeam, a running map, a resolvable offset.
    #[test]
    fn test_documented_scenario() {
        let f = Fixture::new();
        let mut ctx = noop_ctx();

        assert_eq!(f.natives.get_team_count(&mut ctx, &[]), Ok(2));
        assert_eq!(
            f.natives.get_team_score(&mut ctx, &[0]),
            Err(NativeError::InvalidTeamIndex(0))
        );
        assert_eq!(f.natives.set_team_score(&mut ctx, &[1, 42]), Ok(1));
        assert_eq!(f.natives.get_team_score(&mut ctx, &[1]), Ok(42));
    }
}
