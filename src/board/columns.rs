//! Grouping of deals into stage columns for display.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::deal::Deal;
use crate::stage::Stage;

/// One stage column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub stage: Stage,
    pub deals: Vec<Deal>,
    /// Summed deal value per currency code.
    pub totals: BTreeMap<String, f64>,
}

impl BoardColumn {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            deals: Vec::new(),
            totals: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }
}

/// All five columns in stage order. A deal lands in exactly one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumns {
    pub columns: Vec<BoardColumn>,
}

impl BoardColumns {
    pub fn from_deals(deals: &[Deal]) -> Self {
        let mut columns: Vec<BoardColumn> = Stage::ALL.into_iter().map(BoardColumn::new).collect();
        for deal in deals {
            // Stage::ALL order matches declaration order.
            let column = &mut columns[deal.stage as usize];
            *column.totals.entry(deal.currency.clone()).or_insert(0.0) += deal.value;
            column.deals.push(deal.clone());
        }
        Self { columns }
    }

    pub fn column(&self, stage: Stage) -> &BoardColumn {
        &self.columns[stage as usize]
    }

    /// Stage column currently holding the deal with `id`.
    pub fn stage_of(&self, id: &str) -> Option<Stage> {
        self.columns
            .iter()
            .find(|column| column.deals.iter().any(|deal| deal.id.as_str() == id))
            .map(|column| column.stage)
    }
}
