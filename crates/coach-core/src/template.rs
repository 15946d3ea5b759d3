//! Trainer-owned plan templates and their instantiation into versions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Postgres};
use tracing::info;
use uuid::Uuid;

use coach_db::models::{Template, TemplateSummary};
use coach_db::queries::{self, ItemOwner, templates};

use crate::error::{CoachError, CoachResult};
use crate::kind::{self, PlanKind};
use crate::plan::store::{self, PlanWithItems, VersionDraft};

/// A template with its items.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithItems<T> {
    #[serde(flatten)]
    pub template: Template,
    pub items: Vec<T>,
}

/// Name, description and full item list of a template.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDraft<N> {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "Vec::new", alias = "meals", alias = "exercises")]
    pub items: Vec<N>,
}

/// Options for [`instantiate_template`].
#[derive(Debug, Clone, Deserialize)]
pub struct Instantiation {
    pub client_id: Uuid,
    #[serde(default = "default_true", alias = "isActive")]
    pub make_active: bool,
    /// Version title; the template name when absent.
    #[serde(default)]
    pub title: Option<String>,
}

fn default_true() -> bool {
    true
}

fn template_not_found() -> CoachError {
    CoachError::not_found("Template not found")
}

fn validate_draft<K: PlanKind>(draft: &TemplateDraft<K::NewItem>) -> CoachResult<()> {
    if draft.name.trim().is_empty() {
        return Err(CoachError::validation("Template name is required"));
    }
    kind::validate_items::<K>(&draft.items)
}

pub async fn create_template<'a, K, A>(
    db: A,
    trainer_id: Uuid,
    draft: &TemplateDraft<K::NewItem>,
) -> CoachResult<TemplateWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    validate_draft::<K>(draft)?;

    let mut tx = db.begin().await?;
    let template = templates::insert_template(
        &mut *tx,
        &K::TABLES,
        trainer_id,
        draft.name.trim(),
        draft.description.as_deref(),
    )
    .await?;
    let location = K::TABLES.locate(ItemOwner::Template(template.id));
    let items = kind::insert_items::<K>(&mut *tx, location, &draft.items).await?;
    tx.commit().await?;

    info!(kind = K::NAME, %trainer_id, template_id = %template.id, items = items.len(), "template created");
    Ok(TemplateWithItems { template, items })
}

/// Replace a template's fields and its whole item list.
///
/// Items are deleted and re-inserted with fresh order indices, atomically.
/// A template the trainer does not own is `NotFound`.
pub async fn update_template<'a, K, A>(
    db: A,
    trainer_id: Uuid,
    template_id: Uuid,
    draft: &TemplateDraft<K::NewItem>,
) -> CoachResult<TemplateWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    validate_draft::<K>(draft)?;

    let mut tx = db.begin().await?;
    let template = templates::update_template(
        &mut *tx,
        &K::TABLES,
        trainer_id,
        template_id,
        draft.name.trim(),
        draft.description.as_deref(),
    )
    .await?
    .ok_or_else(template_not_found)?;

    let location = K::TABLES.locate(ItemOwner::Template(template.id));
    let removed = queries::delete_items(&mut *tx, location).await?;
    let items = kind::insert_items::<K>(&mut *tx, location, &draft.items).await?;
    tx.commit().await?;

    info!(
        kind = K::NAME,
        %trainer_id,
        %template_id,
        removed,
        items = items.len(),
        "template updated"
    );
    Ok(TemplateWithItems { template, items })
}

pub async fn get_template<'a, K, A>(
    db: A,
    trainer_id: Uuid,
    template_id: Uuid,
) -> CoachResult<TemplateWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    let template = templates::get_template(&mut *conn, &K::TABLES, trainer_id, template_id)
        .await?
        .ok_or_else(template_not_found)?;
    let items =
        queries::list_items(&mut *conn, K::TABLES.locate(ItemOwner::Template(template.id))).await?;
    Ok(TemplateWithItems { template, items })
}

/// The trainer's templates, newest first, with item counts.
pub async fn list_templates<'a, K, A>(db: A, trainer_id: Uuid) -> CoachResult<Vec<TemplateSummary>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    Ok(templates::list_templates(&mut *conn, &K::TABLES, trainer_id).await?)
}

/// Delete a template; its items go with it.
pub async fn delete_template<'a, K, A>(db: A, trainer_id: Uuid, template_id: Uuid) -> CoachResult<()>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    if !templates::delete_template(&mut *conn, &K::TABLES, trainer_id, template_id).await? {
        return Err(template_not_found());
    }
    info!(kind = K::NAME, %trainer_id, %template_id, "template deleted");
    Ok(())
}

/// Copy a template's items into a new version for one of the trainer's
/// clients, through the regular version write path. One transaction.
pub async fn instantiate_template<'a, K, A>(
    db: A,
    trainer_id: Uuid,
    template_id: Uuid,
    request: &Instantiation,
) -> CoachResult<PlanWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut tx = db.begin().await?;

    let template = templates::get_template(&mut *tx, &K::TABLES, trainer_id, template_id)
        .await?
        .ok_or_else(template_not_found)?;
    let items: Vec<K::Item> =
        queries::list_items(&mut *tx, K::TABLES.locate(ItemOwner::Template(template.id))).await?;

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&template.name)
        .to_owned();
    let draft = VersionDraft {
        client_id: request.client_id,
        trainer_id,
        title,
        description: template.description.clone(),
        items: items.iter().map(K::NewItem::from).collect(),
        make_active: request.make_active,
    };

    let plan = store::create_version_on::<K, _>(&mut *tx, &draft, Utc::now().date_naive()).await?;
    tx.commit().await?;

    info!(
        kind = K::NAME,
        %template_id,
        client_id = %request.client_id,
        version_id = %plan.version.id,
        "template instantiated"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use coach_db::models::{NewExercise, NewMeal};

    use super::*;
    use crate::kind::{Diet, Workout};

    #[test]
    fn draft_accepts_kind_specific_item_key() {
        let draft: TemplateDraft<NewMeal> =
            serde_json::from_str(r#"{"name":"Cut","meals":[{"name":"Eggs"}]}"#).unwrap();
        assert_eq!(draft.items.len(), 1);
        assert!(draft.description.is_none());

        let draft: TemplateDraft<NewExercise> =
            serde_json::from_str(r#"{"name":"Push","exercises":[{"name":"Bench","category":"strength"}]}"#)
                .unwrap();
        assert_eq!(draft.items[0].name, "Bench");
    }

    #[test]
    fn blank_template_name_is_rejected() {
        let draft = TemplateDraft::<NewMeal> {
            name: " ".into(),
            description: None,
            items: vec![],
        };
        assert!(matches!(
            validate_draft::<Diet>(&draft),
            Err(CoachError::Validation(_))
        ));

        let draft = TemplateDraft::<NewExercise> {
            name: "Legs".into(),
            description: None,
            items: vec![],
        };
        assert!(validate_draft::<Workout>(&draft).is_ok());
    }

    #[test]
    fn instantiation_defaults_to_active() {
        let req: Instantiation =
            serde_json::from_str(&format!(r#"{{"client_id":"{}"}}"#, Uuid::nil())).unwrap();
        assert!(req.make_active);
        assert!(req.title.is_none());
    }
}
