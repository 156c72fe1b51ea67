//! Every cache table in one cloneable value.
//!
//! `Tables` is plain data: `BTreeMap`s keyed deterministically so that two
//! identical scans produce byte-for-byte identical caches. Inserts enforce
//! the unique keys the schema declares and raise `IntegrityConflict` on
//! violation. Sessions clone the whole value; the maps stay small (one
//! guild's campaign state) so the clone is cheap relative to a sheet fetch.

use rampart_core::{CarrierId, Error, Result, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::entities::fort::{FortDrop, FortOrder, FortSystem, FortUser};
use crate::entities::global::Global;
use crate::entities::kos::KosEntry;
use crate::entities::permissions::{AdminPerm, ChannelPerm, RolePerm};
use crate::entities::spy::{SpyBounty, SpyPrep, SpySystem, SpyTraffic, SpyVote};
use crate::entities::tracking::{TrackSystem, TrackSystemCached, TrackedCarrier};
use crate::entities::undermine::{UmHold, UmSheet, UmSystem, UmUser};
use crate::entities::user::ChatUser;

/// Monotonic id allocators, one per id-bearing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NextIds {
    fort_user: i64,
    fort_system: i64,
    fort_drop: i64,
    um_user: i64,
    um_system: i64,
    um_hold: i64,
    kos: i64,
    spy: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// The complete cache: campaign state plus reference snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    /// Chat users, dispatcher-owned.
    pub users: BTreeMap<UserId, ChatUser>,
    /// Fort sheet contributor rows, scanner-owned.
    pub fort_users: BTreeMap<i64, FortUser>,
    /// Fort sheet system columns, scanner-owned.
    pub fort_systems: BTreeMap<i64, FortSystem>,
    /// Fort contributions, scanner-owned.
    pub fort_drops: BTreeMap<i64, FortDrop>,
    /// Manual fort order, dispatcher-owned. Keyed by ordinal.
    pub fort_orders: BTreeMap<i64, FortOrder>,
    /// Undermine contributor rows, scanner-owned.
    pub um_users: BTreeMap<i64, UmUser>,
    /// Undermine system columns, scanner-owned.
    pub um_systems: BTreeMap<i64, UmSystem>,
    /// Undermine holds, scanner-owned.
    pub um_holds: BTreeMap<i64, UmHold>,
    /// Admin grants, dispatcher-owned.
    pub admins: BTreeMap<UserId, AdminPerm>,
    /// Channel rules, dispatcher-owned.
    pub channel_perms: BTreeSet<ChannelPerm>,
    /// Role rules, dispatcher-owned.
    pub role_perms: BTreeSet<RolePerm>,
    /// KOS entries, scanner-owned (command reports append via the sheet).
    pub kos: BTreeMap<i64, KosEntry>,
    /// Tracked centres, dispatcher-owned. Keyed by system name.
    pub track_systems: BTreeMap<String, TrackSystem>,
    /// Expanded tracked coverage, dispatcher-owned. Keyed by system name.
    pub track_cached: BTreeMap<String, TrackSystemCached>,
    /// Carrier positions, owned by the feed ingester and `track ids`.
    pub carriers: BTreeMap<CarrierId, TrackedCarrier>,
    /// Per-cycle singleton, dispatcher-owned.
    pub global: Option<Global>,
    /// Feed snapshots, reference side.
    pub spy_systems: BTreeMap<i64, SpySystem>,
    /// Power vote snapshots, keyed by power name.
    pub spy_votes: BTreeMap<String, SpyVote>,
    /// Preparation snapshots.
    pub spy_preps: BTreeMap<i64, SpyPrep>,
    /// Traffic snapshots, keyed by system name.
    pub spy_traffic: BTreeMap<String, SpyTraffic>,
    /// Top-bounty snapshots.
    pub spy_bounties: BTreeMap<i64, SpyBounty>,
    next_ids: NextIds,
}

impl Tables {
    // =========================================================================
    // Chat users
    // =========================================================================

    /// Insert a chat user, enforcing the unique preferred name.
    pub fn insert_user(&mut self, user: ChatUser) -> Result<()> {
        if let Some(existing) = self.pref_name_taken(&user.pref_name, Some(user.id)) {
            return Err(Error::IntegrityConflict(format!(
                "Sheet name {} taken by {}.",
                user.pref_name, existing.display_name
            )));
        }
        self.users.insert(user.id, user);
        Ok(())
    }

    /// The user currently holding `pref_name`, excluding `excluding` if given.
    pub fn pref_name_taken(&self, pref_name: &str, excluding: Option<UserId>) -> Option<&ChatUser> {
        self.users
            .values()
            .find(|u| u.pref_name == pref_name && Some(u.id) != excluding)
    }

    // =========================================================================
    // Fort tables
    // =========================================================================

    /// Insert a fort contributor; rows are unique.
    pub fn insert_fort_user(&mut self, mut user: FortUser) -> Result<i64> {
        if self.fort_users.values().any(|u| u.row == user.row) {
            return Err(Error::IntegrityConflict(format!(
                "fort sheet row {} already occupied",
                user.row
            )));
        }
        if user.id == 0 {
            user.id = bump(&mut self.next_ids.fort_user);
        } else {
            self.next_ids.fort_user = self.next_ids.fort_user.max(user.id);
        }
        let id = user.id;
        self.fort_users.insert(id, user);
        Ok(id)
    }

    /// Insert a fort system; name and sheet column are unique.
    pub fn insert_fort_system(&mut self, mut system: FortSystem) -> Result<i64> {
        for existing in self.fort_systems.values() {
            if existing.name == system.name {
                return Err(Error::IntegrityConflict(format!(
                    "fort system {} already present",
                    system.name
                )));
            }
            if existing.sheet_col == system.sheet_col {
                return Err(Error::IntegrityConflict(format!(
                    "fort sheet column {} already mapped to {}",
                    system.sheet_col, existing.name
                )));
            }
        }
        if system.id == 0 {
            system.id = bump(&mut self.next_ids.fort_system);
        } else {
            self.next_ids.fort_system = self.next_ids.fort_system.max(system.id);
        }
        let id = system.id;
        self.fort_systems.insert(id, system);
        Ok(id)
    }

    /// Insert a drop; one per (contributor, target).
    pub fn insert_fort_drop(&mut self, mut drop: FortDrop) -> Result<i64> {
        if self
            .fort_drops
            .values()
            .any(|d| d.user_id == drop.user_id && d.system_id == drop.system_id)
        {
            return Err(Error::IntegrityConflict(format!(
                "drop already recorded for user {} at system {}",
                drop.user_id, drop.system_id
            )));
        }
        if drop.id == 0 {
            drop.id = bump(&mut self.next_ids.fort_drop);
        } else {
            self.next_ids.fort_drop = self.next_ids.fort_drop.max(drop.id);
        }
        let id = drop.id;
        self.fort_drops.insert(id, drop);
        Ok(id)
    }

    /// Insert a manual-order row; ordinal and name are unique.
    pub fn insert_fort_order(&mut self, order: FortOrder) -> Result<()> {
        if self.fort_orders.contains_key(&order.order)
            || self.fort_orders.values().any(|o| o.system_name == order.system_name)
        {
            return Err(Error::IntegrityConflict(format!(
                "duplicate fort order entry {} / {}",
                order.order, order.system_name
            )));
        }
        self.fort_orders.insert(order.order, order);
        Ok(())
    }

    /// Sum of drops at a fort system.
    pub fn fort_cmdr_merits(&self, system_id: i64) -> i64 {
        self.fort_drops
            .values()
            .filter(|d| d.system_id == system_id)
            .map(|d| d.amount)
            .sum()
    }

    /// Sum of drops made by a fort contributor.
    pub fn fort_user_dropped(&self, user_id: i64) -> i64 {
        self.fort_drops.values().filter(|d| d.user_id == user_id).map(|d| d.amount).sum()
    }

    // =========================================================================
    // Undermine tables
    // =========================================================================

    /// Insert an undermine contributor; (sheet, row) is unique.
    pub fn insert_um_user(&mut self, mut user: UmUser) -> Result<i64> {
        if self.um_users.values().any(|u| u.sheet == user.sheet && u.row == user.row) {
            return Err(Error::IntegrityConflict(format!(
                "um sheet row {} already occupied",
                user.row
            )));
        }
        if user.id == 0 {
            user.id = bump(&mut self.next_ids.um_user);
        } else {
            self.next_ids.um_user = self.next_ids.um_user.max(user.id);
        }
        let id = user.id;
        self.um_users.insert(id, user);
        Ok(id)
    }

    /// Insert an undermine system; (sheet, column) is unique.
    pub fn insert_um_system(&mut self, mut system: UmSystem) -> Result<i64> {
        if self
            .um_systems
            .values()
            .any(|s| s.sheet == system.sheet && s.sheet_col == system.sheet_col)
        {
            return Err(Error::IntegrityConflict(format!(
                "um sheet column {} already mapped",
                system.sheet_col
            )));
        }
        if system.id == 0 {
            system.id = bump(&mut self.next_ids.um_system);
        } else {
            self.next_ids.um_system = self.next_ids.um_system.max(system.id);
        }
        let id = system.id;
        self.um_systems.insert(id, system);
        Ok(id)
    }

    /// Insert a hold; one per (sheet, contributor, system).
    pub fn insert_um_hold(&mut self, mut hold: UmHold) -> Result<i64> {
        if hold.held < 0 || hold.redeemed < 0 {
            return Err(Error::ValidationFail(format!(
                "held and redeemed must be >= 0, got {}/{}",
                hold.held, hold.redeemed
            )));
        }
        if self.um_holds.values().any(|h| {
            h.sheet == hold.sheet && h.user_id == hold.user_id && h.system_id == hold.system_id
        }) {
            return Err(Error::IntegrityConflict(format!(
                "hold already recorded for user {} at system {}",
                hold.user_id, hold.system_id
            )));
        }
        if hold.id == 0 {
            hold.id = bump(&mut self.next_ids.um_hold);
        } else {
            self.next_ids.um_hold = self.next_ids.um_hold.max(hold.id);
        }
        let id = hold.id;
        self.um_holds.insert(id, hold);
        Ok(id)
    }

    /// Held plus redeemed merits at an undermine system.
    pub fn um_cmdr_merits(&self, system_id: i64) -> i64 {
        self.um_holds
            .values()
            .filter(|h| h.system_id == system_id)
            .map(|h| h.held + h.redeemed)
            .sum()
    }

    /// Merits currently held at an undermine system.
    pub fn um_held_merits(&self, system_id: i64) -> i64 {
        self.um_holds.values().filter(|h| h.system_id == system_id).map(|h| h.held).sum()
    }

    /// Held and redeemed totals for a contributor on the main sheet.
    pub fn um_user_totals(&self, user_id: i64) -> (i64, i64) {
        self.um_holds
            .values()
            .filter(|h| h.user_id == user_id && h.sheet != UmSheet::Snipe)
            .fold((0, 0), |(held, redeemed), h| (held + h.held, redeemed + h.redeemed))
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Grant admin to a user.
    pub fn insert_admin(&mut self, perm: AdminPerm) -> Result<()> {
        if self.admins.contains_key(&perm.id) {
            return Err(Error::IntegrityConflict(format!("user {} is already an admin", perm.id)));
        }
        self.admins.insert(perm.id, perm);
        Ok(())
    }

    /// Add a channel rule; exact duplicates conflict.
    pub fn insert_channel_perm(&mut self, perm: ChannelPerm) -> Result<()> {
        if !self.channel_perms.insert(perm) {
            return Err(Error::IntegrityConflict("Channel permission already exists.".into()));
        }
        Ok(())
    }

    /// Add a role rule; exact duplicates conflict.
    pub fn insert_role_perm(&mut self, perm: RolePerm) -> Result<()> {
        if !self.role_perms.insert(perm) {
            return Err(Error::IntegrityConflict("Role permission already exists.".into()));
        }
        Ok(())
    }

    // =========================================================================
    // KOS
    // =========================================================================

    /// Insert a KOS entry; cmdr names never repeat.
    pub fn insert_kos(&mut self, mut entry: KosEntry) -> Result<i64> {
        if self.kos.values().any(|k| k.cmdr.eq_ignore_ascii_case(&entry.cmdr)) {
            return Err(Error::IntegrityConflict(format!(
                "KOS entry for {} already present",
                entry.cmdr
            )));
        }
        if entry.id == 0 {
            entry.id = bump(&mut self.next_ids.kos);
        } else {
            self.next_ids.kos = self.next_ids.kos.max(entry.id);
        }
        let id = entry.id;
        self.kos.insert(id, entry);
        Ok(id)
    }

    // =========================================================================
    // Spy snapshots
    // =========================================================================

    /// Allocate an id for a spy row.
    pub fn next_spy_id(&mut self) -> i64 {
        bump(&mut self.next_ids.spy)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drop all scanner-owned rows; with `include_permanent` also drop the
    /// rows that chat commands created.
    pub fn empty_tables(&mut self, include_permanent: bool) {
        self.fort_drops.clear();
        self.um_holds.clear();
        self.fort_systems.clear();
        self.um_systems.clear();
        self.fort_users.clear();
        self.um_users.clear();
        self.kos.clear();
        self.spy_systems.clear();
        self.spy_votes.clear();
        self.spy_preps.clear();
        self.spy_traffic.clear();
        self.spy_bounties.clear();

        if include_permanent {
            self.users.clear();
            self.admins.clear();
            self.channel_perms.clear();
            self.role_perms.clear();
            self.fort_orders.clear();
            self.track_systems.clear();
            self.track_cached.clear();
            self.carriers.clear();
            self.global = None;
            self.next_ids = NextIds::default();
        }
    }

    /// Drop only the fort-sheet rows, ahead of a fort rescan.
    pub fn drop_fort_rows(&mut self) {
        self.fort_drops.clear();
        self.fort_systems.clear();
        self.fort_users.clear();
        self.next_ids.fort_user = 0;
        self.next_ids.fort_system = 0;
        self.next_ids.fort_drop = 0;
    }

    /// Drop one undermine sheet's rows, ahead of its rescan.
    ///
    /// The id allocators rewind to the surviving rows so a rescan hands
    /// out the same ids it did last time — reparses stay deterministic.
    pub fn drop_um_rows(&mut self, sheet: UmSheet) {
        self.um_holds.retain(|_, h| h.sheet != sheet);
        self.um_systems.retain(|_, s| s.sheet != sheet);
        self.um_users.retain(|_, u| u.sheet != sheet);
        self.next_ids.um_user = self.um_users.keys().max().copied().unwrap_or(0);
        self.next_ids.um_system = self.um_systems.keys().max().copied().unwrap_or(0);
        self.next_ids.um_hold = self.um_holds.keys().max().copied().unwrap_or(0);
    }

    /// Drop the KOS rows, ahead of a KOS rescan.
    pub fn drop_kos_rows(&mut self) {
        self.kos.clear();
        self.next_ids.kos = 0;
    }
}
