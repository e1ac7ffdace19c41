//! Vision and goal repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Only active (`deleted_at IS NULL`) rows are returned by default.
//! - Listing is deterministic: `created_at ASC, id ASC`.
//! - Direct updates never touch tombstones; those go through change sets.

use super::codec::{bool_to_int, parse_bool, parse_optional_uuid, parse_uuid};
use super::{RepoError, RepoResult, SqlitePlannerRepository, Visibility};
use crate::model::goal::{Goal, GoalId, GoalStatus, GoalTier};
use crate::model::item::ItemRef;
use crate::model::vision::{Vision, VisionId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const VISION_SELECT_SQL: &str = "SELECT
    id,
    pillar,
    title,
    description,
    created_at,
    deleted_at
FROM visions";

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    vision_id,
    parent_goal_id,
    tier,
    title,
    status,
    is_focus,
    created_at,
    deleted_at
FROM goals";

/// Query options for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalListQuery {
    pub vision_id: Option<VisionId>,
    pub parent_goal_id: Option<GoalId>,
    pub tier: Option<GoalTier>,
    pub visibility: Visibility,
}

/// Repository interface for the vision → goal hierarchy.
pub trait HierarchyRepository {
    fn create_vision(&self, vision: &Vision) -> RepoResult<VisionId>;
    /// Updates pillar/title/description of an active vision.
    fn update_vision(&self, vision: &Vision) -> RepoResult<()>;
    fn get_vision(&self, id: VisionId, include_deleted: bool) -> RepoResult<Option<Vision>>;
    fn list_visions(&self, visibility: Visibility) -> RepoResult<Vec<Vision>>;
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId>;
    /// Updates title/status/focus of an active goal.
    fn update_goal(&self, goal: &Goal) -> RepoResult<()>;
    fn get_goal(&self, id: GoalId, include_deleted: bool) -> RepoResult<Option<Goal>>;
    fn list_goals(&self, query: &GoalListQuery) -> RepoResult<Vec<Goal>>;
    /// Lists active strict descendants of one goal.
    fn list_goal_descendants(&self, root: GoalId) -> RepoResult<Vec<Goal>>;
}

impl HierarchyRepository for SqlitePlannerRepository<'_> {
    fn create_vision(&self, vision: &Vision) -> RepoResult<VisionId> {
        vision.validate()?;
        self.conn.execute(
            "INSERT INTO visions (
                id,
                pillar,
                title,
                description,
                created_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                vision.id.to_string(),
                vision.pillar.as_str(),
                vision.title.as_str(),
                vision.description.as_str(),
                vision.created_at,
                vision.deleted_at,
            ],
        )?;
        Ok(vision.id)
    }

    fn update_vision(&self, vision: &Vision) -> RepoResult<()> {
        vision.validate()?;
        let changed = self.conn.execute(
            "UPDATE visions
             SET
                pillar = ?1,
                title = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4
               AND deleted_at IS NULL;",
            params![
                vision.pillar.as_str(),
                vision.title.as_str(),
                vision.description.as_str(),
                vision.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::Vision(vision.id)));
        }
        Ok(())
    }

    fn get_vision(&self, id: VisionId, include_deleted: bool) -> RepoResult<Option<Vision>> {
        load_vision(self.conn, id, include_deleted)
    }

    fn list_visions(&self, visibility: Visibility) -> RepoResult<Vec<Vision>> {
        let sql = format!(
            "{VISION_SELECT_SQL} WHERE 1 = 1{} ORDER BY created_at ASC, id ASC",
            visibility.sql_clause("deleted_at")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut visions = Vec::new();
        while let Some(row) = rows.next()? {
            visions.push(parse_vision_row(row)?);
        }
        Ok(visions)
    }

    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId> {
        goal.validate()?;
        self.conn.execute(
            "INSERT INTO goals (
                id,
                vision_id,
                parent_goal_id,
                tier,
                title,
                status,
                is_focus,
                created_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                goal.id.to_string(),
                goal.vision_id.to_string(),
                goal.parent_goal_id.map(|value| value.to_string()),
                goal.tier.as_str(),
                goal.title.as_str(),
                goal.status.as_str(),
                bool_to_int(goal.is_focus),
                goal.created_at,
                goal.deleted_at,
            ],
        )?;
        Ok(goal.id)
    }

    fn update_goal(&self, goal: &Goal) -> RepoResult<()> {
        goal.validate()?;
        let changed = self.conn.execute(
            "UPDATE goals
             SET
                title = ?1,
                status = ?2,
                is_focus = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4
               AND deleted_at IS NULL;",
            params![
                goal.title.as_str(),
                goal.status.as_str(),
                bool_to_int(goal.is_focus),
                goal.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ItemRef::Goal(goal.id)));
        }
        Ok(())
    }

    fn get_goal(&self, id: GoalId, include_deleted: bool) -> RepoResult<Option<Goal>> {
        load_goal(self.conn, id, include_deleted)
    }

    fn list_goals(&self, query: &GoalListQuery) -> RepoResult<Vec<Goal>> {
        let mut sql = format!(
            "{GOAL_SELECT_SQL} WHERE 1 = 1{}",
            query.visibility.sql_clause("deleted_at")
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(vision_id) = query.vision_id {
            sql.push_str(" AND vision_id = ?");
            bind_values.push(Value::Text(vision_id.to_string()));
        }
        if let Some(parent_goal_id) = query.parent_goal_id {
            sql.push_str(" AND parent_goal_id = ?");
            bind_values.push(Value::Text(parent_goal_id.to_string()));
        }
        if let Some(tier) = query.tier {
            sql.push_str(" AND tier = ?");
            bind_values.push(Value::Text(tier.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }

    fn list_goal_descendants(&self, root: GoalId) -> RepoResult<Vec<Goal>> {
        let mut stmt = self.conn.prepare(&format!(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id
                FROM goals
                WHERE parent_goal_id = ?1
                  AND deleted_at IS NULL
                UNION ALL
                SELECT child.id
                FROM goals child
                INNER JOIN subtree parent ON child.parent_goal_id = parent.id
                WHERE child.deleted_at IS NULL
            )
            {GOAL_SELECT_SQL}
            WHERE id IN (SELECT id FROM subtree)
            ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([root.to_string()])?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }
}

pub(crate) fn load_vision(
    conn: &Connection,
    id: VisionId,
    include_deleted: bool,
) -> RepoResult<Option<Vision>> {
    let mut stmt = conn.prepare(&format!(
        "{VISION_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_vision_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_goal(
    conn: &Connection,
    id: GoalId,
    include_deleted: bool,
) -> RepoResult<Option<Goal>> {
    let mut stmt = conn.prepare(&format!(
        "{GOAL_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_goal_row(row)?));
    }
    Ok(None)
}

fn parse_vision_row(row: &Row<'_>) -> RepoResult<Vision> {
    let id_text: String = row.get("id")?;
    let vision = Vision {
        id: parse_uuid(&id_text, "visions.id")?,
        pillar: row.get("pillar")?,
        title: row.get("title")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    vision.validate()?;
    Ok(vision)
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<Goal> {
    let id_text: String = row.get("id")?;
    let vision_text: String = row.get("vision_id")?;

    let tier_text: String = row.get("tier")?;
    let tier = GoalTier::parse(&tier_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid goal tier `{tier_text}` in goals.tier"))
    })?;

    let status_text: String = row.get("status")?;
    let status = GoalStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid goal status `{status_text}` in goals.status"
        ))
    })?;

    let goal = Goal {
        id: parse_uuid(&id_text, "goals.id")?,
        tier,
        title: row.get("title")?,
        parent_goal_id: parse_optional_uuid(row.get("parent_goal_id")?, "goals.parent_goal_id")?,
        vision_id: parse_uuid(&vision_text, "goals.vision_id")?,
        status,
        is_focus: parse_bool(row.get("is_focus")?, "goals.is_focus")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    goal.validate()?;
    Ok(goal)
}
