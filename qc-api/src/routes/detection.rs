//! `schema-detection/*` — the Drift Detector's read-only and save-back
//! endpoints (spec §4.7, §4.11).

use axum::extract::State;
use axum::Json;
use qc_core::drift::{DriftDetector, DriftProposal};
use qc_core::model::TableSchema;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ProposalDto {
    pub kind: &'static str,
    pub schema: TableSchema,
}

impl From<DriftProposal> for ProposalDto {
    fn from(p: DriftProposal) -> Self {
        match p {
            DriftProposal::NewTable(s) => ProposalDto { kind: "new_table", schema: s },
            DriftProposal::AlteredTable(s) => ProposalDto { kind: "altered_table", schema: s },
            DriftProposal::DroppedTable(s) => ProposalDto { kind: "dropped_table", schema: s },
        }
    }
}

async fn detect_all(state: &SharedState) -> ApiResult<Vec<DriftProposal>> {
    let active = state.catalog.list_all_active().await?;
    Ok(DriftDetector::detect(&state.baseline_pool, &active).await?)
}

pub async fn all(State(state): State<SharedState>) -> ApiResult<Json<Vec<ProposalDto>>> {
    let proposals = detect_all(&state).await?;
    Ok(Json(proposals.into_iter().map(ProposalDto::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub table_name: String,
}

pub async fn table(
    State(state): State<SharedState>,
    axum::extract::Query(q): axum::extract::Query<TableQuery>,
) -> ApiResult<Json<Vec<ProposalDto>>> {
    let proposals = detect_all(&state).await?;
    let filtered = proposals
        .into_iter()
        .filter(|p| proposal_table_name(p) == q.table_name)
        .map(ProposalDto::from)
        .collect();
    Ok(Json(filtered))
}

#[derive(Debug, Serialize)]
pub struct DetectAndSaveResponse {
    pub new_tables: usize,
    pub altered_tables: usize,
    pub dropped_tables: usize,
}

/// Persist every proposal: new/altered tables go through `put_new_version`,
/// dropped tables are soft-deleted out of the active catalog.
pub async fn detect_and_save(State(state): State<SharedState>) -> ApiResult<Json<DetectAndSaveResponse>> {
    let proposals = detect_all(&state).await?;

    let mut response = DetectAndSaveResponse { new_tables: 0, altered_tables: 0, dropped_tables: 0 };

    for proposal in proposals {
        match proposal {
            DriftProposal::NewTable(schema) => {
                state.catalog.put_new_version(&schema).await?;
                response.new_tables += 1;
            }
            DriftProposal::AlteredTable(schema) => {
                state.catalog.put_new_version(&schema).await?;
                response.altered_tables += 1;
            }
            DriftProposal::DroppedTable(schema) => {
                state.catalog.soft_delete(&schema.table_name, schema.database_type, schema.partition_type).await?;
                response.dropped_tables += 1;
            }
        }
    }

    Ok(Json(response))
}

fn proposal_table_name(p: &DriftProposal) -> &str {
    match p {
        DriftProposal::NewTable(s) | DriftProposal::AlteredTable(s) | DriftProposal::DroppedTable(s) => {
            &s.table_name
        }
    }
}
