//! Run lifecycle
//!
//! [`RunLedger`] validates requests, checks who may delete what, runs the
//! split calculator over a run's current amounts and writes the results back
//! through the [`RunStore`].

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::calculator::{self, check_amount};
use crate::error::{Result, RunError};
use crate::models::{Amount, Distribution, Identity, Run, RunId, RunKind, RunSnapshot};
use crate::store::RunStore;
use crate::tables::CraftingCost;

/// Decides whether an identity holds the administrator role
pub trait AdminCheck: Send + Sync {
    fn is_admin(&self, who: &Identity) -> bool;
}

impl<F> AdminCheck for F
where
    F: Fn(&Identity) -> bool + Send + Sync,
{
    fn is_admin(&self, who: &Identity) -> bool {
        self(who)
    }
}

/// Nobody is an administrator; only creators may delete their runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdmins;

impl AdminCheck for NoAdmins {
    fn is_admin(&self, _who: &Identity) -> bool {
        false
    }
}

/// Fixed set of administrator names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList(HashSet<String>);

impl AdminList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            names
                .into_iter()
                .map(|n| {
                    let n: String = n.into();
                    n.trim().to_string()
                })
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AdminCheck for AdminList {
    fn is_admin(&self, who: &Identity) -> bool {
        self.0.contains(who.as_str())
    }
}

/// One field change on a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    AddPlayer(String),
    Sand(Amount),
    StravMass(Amount),
    Titanium(Amount),
    Fiber(Amount),
}

impl RunUpdate {
    /// Build an update from a textual field tag and its payload
    ///
    /// `players` takes `value`; every other field takes `amount`.
    pub fn parse(field: &str, value: Option<&str>, amount: Option<&str>) -> Result<Self> {
        let field = field.trim().to_ascii_lowercase();
        if field == "players" || field == "player" {
            let name = value.map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(RunError::invalid("a player name is required for field 'players'"));
            }
            return Ok(RunUpdate::AddPlayer(name.to_string()));
        }

        let make: fn(Amount) -> RunUpdate = match field.as_str() {
            "spice" | "sand" => RunUpdate::Sand,
            "stravidium" | "plastanium" | "mass" => RunUpdate::StravMass,
            "titanium" => RunUpdate::Titanium,
            "fiber" => RunUpdate::Fiber,
            other => {
                return Err(RunError::invalid(format!(
                    "unknown field '{other}', expected \
                     players|spice|stravidium|plastanium|titanium|fiber"
                )));
            }
        };
        let raw = amount
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                RunError::invalid(format!("an amount is required for field '{field}'"))
            })?;
        let amount: Decimal = raw
            .parse()
            .map_err(|_| RunError::invalid(format!("'{raw}' is not a number")))?;
        Ok(make(amount))
    }

    fn field_name(&self) -> &'static str {
        match self {
            RunUpdate::AddPlayer(_) => "players",
            RunUpdate::Sand(_) => "sand",
            RunUpdate::StravMass(_) => "stravidium mass",
            RunUpdate::Titanium(_) => "titanium ore",
            RunUpdate::Fiber(_) => "stravidium fiber",
        }
    }

    fn applies_to(&self, kind: RunKind) -> bool {
        match self {
            RunUpdate::AddPlayer(_) => true,
            RunUpdate::Sand(_) => kind == RunKind::Spice,
            RunUpdate::StravMass(_) | RunUpdate::Titanium(_) => {
                matches!(kind, RunKind::Stravidium | RunKind::Plastanium)
            }
            RunUpdate::Fiber(_) => kind == RunKind::Plastanium,
        }
    }

    /// Validate against `run` and apply. Amounts replace the stored value.
    fn apply(self, run: &mut Run) -> Result<()> {
        if !self.applies_to(run.kind) {
            return Err(RunError::invalid(format!(
                "field '{}' does not apply to a {} run",
                self.field_name(),
                run.kind
            )));
        }
        match self {
            RunUpdate::AddPlayer(name) => {
                if run.players.contains(&name) {
                    return Err(RunError::Conflict(format!(
                        "player '{name}' is already in run {}",
                        run.id
                    )));
                }
                run.players.push(name);
            }
            RunUpdate::Sand(a) => {
                check_amount("spice sand", a)?;
                run.sand = a;
            }
            RunUpdate::StravMass(a) => {
                check_amount("stravidium mass", a)?;
                run.strav_mass = a;
            }
            RunUpdate::Titanium(a) => {
                check_amount("titanium ore", a)?;
                run.titanium_ore = a;
            }
            RunUpdate::Fiber(a) => {
                check_amount("stravidium fiber", a)?;
                run.fiber = a;
            }
        }
        run.last_calculation = None;
        Ok(())
    }
}

/// Refinery counts and cost tier for a run calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stations {
    /// Spice refineries for spice runs, chemical refineries otherwise
    pub processors: u32,
    /// Large ore refineries, used by plastanium runs
    pub large_refineries: u32,
    pub cost: CraftingCost,
}

impl Stations {
    pub fn new(processors: u32) -> Self {
        Self {
            processors,
            large_refineries: processors,
            cost: CraftingCost::Standard,
        }
    }

    pub fn with_large_refineries(mut self, large_refineries: u32) -> Self {
        self.large_refineries = large_refineries;
        self
    }

    pub fn with_cost(mut self, cost: CraftingCost) -> Self {
        self.cost = cost;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.processors == 0 {
            return Err(RunError::invalid("processors must be at least 1"));
        }
        if self.large_refineries == 0 {
            return Err(RunError::invalid("large ore refineries must be at least 1"));
        }
        Ok(())
    }
}

/// Parse a comma separated roster, trimming names and dropping blanks
pub fn parse_players(csv: &str) -> Result<Vec<String>> {
    let mut players: Vec<String> = Vec::new();
    for name in csv.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if players.iter().any(|p| p == name) {
            return Err(RunError::Conflict(format!("player '{name}' is listed twice")));
        }
        players.push(name.to_string());
    }
    if players.is_empty() {
        return Err(RunError::invalid("provide at least one player"));
    }
    Ok(players)
}

fn distribute(run: &Run, stations: Stations) -> Result<Distribution> {
    let players = u32::try_from(run.players.len())
        .map_err(|_| RunError::invalid("too many players"))?;
    if players == 0 {
        return Err(RunError::invalid(format!("run {} has no players", run.id)));
    }

    let result = match run.kind {
        RunKind::Spice => {
            Distribution::Spice(calculator::compute_spice(run.sand, players, stations.processors)?)
        }
        RunKind::Stravidium => Distribution::Stravidium(calculator::compute_stravidium_raw(
            run.strav_mass,
            run.titanium_ore,
            players,
            stations.processors,
            stations.cost,
        )?),
        RunKind::Plastanium => Distribution::Plastanium(calculator::compute_plastanium_with_stock(
            run.strav_mass,
            run.fiber,
            run.titanium_ore,
            players,
            stations.large_refineries,
            stations.processors,
            stations.cost,
        )?),
    };
    Ok(result)
}

/// Run registry plus the rules for changing it
pub struct RunLedger {
    store: RunStore,
    admins: Arc<dyn AdminCheck>,
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new(Arc::new(NoAdmins))
    }
}

impl RunLedger {
    pub fn new(admins: Arc<dyn AdminCheck>) -> Self {
        Self::with_store(RunStore::new(), admins)
    }

    pub fn with_store(store: RunStore, admins: Arc<dyn AdminCheck>) -> Self {
        Self { store, admins }
    }

    pub fn create_run(
        &self,
        kind: RunKind,
        creator: &Identity,
        players_csv: &str,
    ) -> Result<RunId> {
        let players = parse_players(players_csv)?;
        let count = players.len();
        let id = self.store.create(kind, creator.clone(), players);
        info!(run_id = %id, %kind, creator = %creator, players = count, "run created");
        Ok(id)
    }

    pub fn update_run(&self, id: RunId, update: RunUpdate) -> Result<()> {
        debug!(run_id = %id, ?update, "updating run");
        self.store.update(id, |run| update.apply(run)).inspect_err(|e| {
            warn!(run_id = %id, code = e.code(), error = %e, "run update rejected");
        })
    }

    /// Compute a fresh distribution over the run's current amounts and cache it
    pub fn calculate_run(&self, id: RunId, stations: Stations) -> Result<Distribution> {
        stations.validate()?;
        let result = self.store.update(id, |run| {
            let result = distribute(run, stations)?;
            run.last_calculation = Some(result.clone());
            Ok(result)
        })?;
        let share = result.share();
        info!(
            run_id = %id,
            per_player = share.per_player,
            remainder = share.remainder,
            "run calculated"
        );
        Ok(result)
    }

    pub fn view_run(&self, id: RunId) -> Result<RunSnapshot> {
        self.store.get(id)
    }

    pub fn list_runs(&self) -> Vec<RunSnapshot> {
        self.store.list()
    }

    /// Delete a run. Only its creator or an administrator may do so.
    pub fn delete_run(&self, id: RunId, requester: &Identity) -> Result<()> {
        let admins = &self.admins;
        self.store
            .delete(id, |run| {
                if &run.creator == requester || admins.is_admin(requester) {
                    Ok(())
                } else {
                    Err(RunError::PermissionDenied {
                        requester: requester.clone(),
                        run: id,
                    })
                }
            })
            .inspect_err(|e| {
                warn!(run_id = %id, %requester, code = e.code(), "run delete rejected")
            })?;
        info!(run_id = %id, %requester, "run deleted");
        Ok(())
    }

    /// Delete every run. Administrators only.
    ///
    /// Returns how many runs were removed. Runs deleted concurrently by
    /// someone else are skipped.
    pub fn clear_runs(&self, requester: &Identity) -> Result<usize> {
        if !self.admins.is_admin(requester) {
            warn!(%requester, "run clear rejected");
            return Err(RunError::NotAdmin(requester.clone()));
        }
        let mut removed = 0;
        for run in self.store.list() {
            match self.store.delete(run.id, |_| Ok(())) {
                Ok(_) => removed += 1,
                Err(RunError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(%requester, removed, "runs cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn ledger() -> RunLedger {
        RunLedger::new(Arc::new(AdminList::new(["stilgar"])))
    }

    #[test]
    fn test_parse_players_trims_and_drops_blanks() {
        let players = parse_players(" paul , chani,, jessica ").unwrap();
        assert_eq!(players, vec!["paul", "chani", "jessica"]);
    }

    #[test]
    fn test_parse_players_rejects_empty_and_duplicates() {
        assert_eq!(parse_players(" , ,").unwrap_err().code(), "INVALID_ARGUMENT");
        assert_eq!(parse_players("paul,paul").unwrap_err().code(), "CONFLICT");
    }

    #[test]
    fn test_update_parse() {
        assert_eq!(
            RunUpdate::parse("Spice", None, Some("2500.5")).unwrap(),
            RunUpdate::Sand(Decimal::new(25005, 1))
        );
        assert_eq!(
            RunUpdate::parse("players", Some(" gurney "), None).unwrap(),
            RunUpdate::AddPlayer("gurney".into())
        );
        assert_eq!(
            RunUpdate::parse("plastanium", None, Some("5")).unwrap(),
            RunUpdate::StravMass(dec(5))
        );
        assert!(RunUpdate::parse("water", None, Some("1")).is_err());
        assert!(RunUpdate::parse("titanium", None, Some("lots")).is_err());
        assert!(RunUpdate::parse("titanium", None, None).is_err());
        assert!(RunUpdate::parse("players", None, None).is_err());
    }

    #[test]
    fn test_amounts_replace() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "paul").unwrap();
        ledger.update_run(id, RunUpdate::Sand(dec(5_000))).unwrap();
        ledger.update_run(id, RunUpdate::Sand(dec(2_000))).unwrap();
        assert_eq!(ledger.view_run(id).unwrap().sand, dec(2_000));
    }

    #[test]
    fn test_field_must_match_kind() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "paul").unwrap();
        let err = ledger.update_run(id, RunUpdate::Titanium(dec(4))).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");

        let id = ledger.create_run(RunKind::Stravidium, &"leto".into(), "paul").unwrap();
        assert!(ledger.update_run(id, RunUpdate::Fiber(dec(4))).is_err());
        assert!(ledger.update_run(id, RunUpdate::Titanium(dec(4))).is_ok());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Plastanium, &"leto".into(), "paul").unwrap();
        ledger.update_run(id, RunUpdate::StravMass(dec(30))).unwrap();
        let err = ledger.update_run(id, RunUpdate::StravMass(dec(-1))).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert_eq!(ledger.view_run(id).unwrap().strav_mass, dec(30));
    }

    #[test]
    fn test_duplicate_player_conflicts() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "paul, chani").unwrap();
        let err = ledger.update_run(id, RunUpdate::AddPlayer("chani".into())).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        ledger.update_run(id, RunUpdate::AddPlayer("duncan".into())).unwrap();
        assert_eq!(ledger.view_run(id).unwrap().players, vec!["paul", "chani", "duncan"]);
    }

    #[test]
    fn test_calculate_caches_and_update_clears() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "a,b,c,d").unwrap();
        ledger.update_run(id, RunUpdate::Sand(dec(10_000))).unwrap();
        let result = ledger.calculate_run(id, Stations::new(2)).unwrap();
        assert_eq!(ledger.view_run(id).unwrap().last_calculation, Some(result));

        ledger.update_run(id, RunUpdate::AddPlayer("e".into())).unwrap();
        assert!(ledger.view_run(id).unwrap().last_calculation.is_none());
        let again = ledger.calculate_run(id, Stations::new(2)).unwrap();
        assert_eq!(again.share().per_player, 40);
    }

    #[test]
    fn test_calculate_plastanium_run() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Plastanium, &"leto".into(), "a,b,c,d").unwrap();
        ledger.update_run(id, RunUpdate::StravMass(dec(1_000))).unwrap();
        ledger.update_run(id, RunUpdate::Titanium(dec(10_000))).unwrap();
        let result = ledger.calculate_run(id, Stations::new(2)).unwrap();
        let Distribution::Plastanium(d) = result else {
            panic!("expected plastanium result");
        };
        assert_eq!(d.plastanium.plastanium_total, 333);
        assert_eq!(d.plastanium_per_player, 83);
        assert_eq!(d.remainder, 1);
    }

    #[test]
    fn test_calculate_stravidium_with_landsraad() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Stravidium, &"leto".into(), "a").unwrap();
        ledger.update_run(id, RunUpdate::StravMass(dec(1_000))).unwrap();
        let stations = Stations::new(1).with_cost(CraftingCost::Landsraad);
        let Distribution::Stravidium(d) = ledger.calculate_run(id, stations).unwrap() else {
            panic!("expected stravidium result");
        };
        assert_eq!(d.fibers.fiber_total, 444);
    }

    #[test]
    fn test_zero_processors_keeps_cached_result() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "a").unwrap();
        ledger.update_run(id, RunUpdate::Sand(dec(10_000))).unwrap();
        let cached = ledger.calculate_run(id, Stations::new(1)).unwrap();

        let err = ledger.calculate_run(id, Stations::new(0)).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        let err = ledger
            .calculate_run(id, Stations::new(1).with_large_refineries(0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert_eq!(ledger.view_run(id).unwrap().last_calculation, Some(cached));
    }

    #[test]
    fn test_delete_permissions() {
        let ledger = ledger();
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "a").unwrap();

        let err = ledger.delete_run(id, &"feyd".into()).unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert!(ledger.view_run(id).is_ok());

        ledger.delete_run(id, &"leto".into()).unwrap();
        assert_eq!(ledger.view_run(id), Err(RunError::NotFound(id)));

        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "a").unwrap();
        ledger.delete_run(id, &"stilgar".into()).unwrap();
        assert!(ledger.list_runs().is_empty());
    }

    #[test]
    fn test_clear_requires_admin() {
        let ledger = ledger();
        ledger.create_run(RunKind::Spice, &"leto".into(), "a").unwrap();
        ledger.create_run(RunKind::Plastanium, &"feyd".into(), "b").unwrap();

        let err = ledger.clear_runs(&"leto".into()).unwrap_err();
        assert_eq!(err, RunError::NotAdmin("leto".into()));
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert_eq!(ledger.list_runs().len(), 2);

        assert_eq!(ledger.clear_runs(&"stilgar".into()).unwrap(), 2);
        assert!(ledger.list_runs().is_empty());
        assert_eq!(ledger.clear_runs(&"stilgar".into()).unwrap(), 0);
    }

    #[test]
    fn test_closure_admin_check() {
        let is_admin = |who: &Identity| who.as_str().starts_with("admin:");
        let ledger = RunLedger::new(Arc::new(is_admin));
        let id = ledger.create_run(RunKind::Spice, &"leto".into(), "a").unwrap();
        assert!(ledger.delete_run(id, &"rabban".into()).is_err());
        ledger.delete_run(id, &"admin:rabban".into()).unwrap();
    }
}
