use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Catalog, JoinTable};
use crate::error::Result;
use crate::models::{FilterValue, QueryRequest};

mod comparison;
mod filters;
mod joins;
mod render;

pub use comparison::comparison_request;

/// One executable statement: SQL text with `$n` placeholders and the values
/// to bind, in placeholder order.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<FilterValue>,
}

/// The primary statement plus, when the request asks for a period
/// comparison, a second statement over the shifted window.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub primary: CompiledStatement,
    pub comparison: Option<CompiledStatement>,
    /// Tables both statements join, iterating in join order.
    pub joins: BTreeSet<JoinTable>,
}

pub struct SqlBuilder {
    catalog: Arc<Catalog>,
}

impl SqlBuilder {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Compiles a validated request. The caller is expected to have run the
    /// request through [`crate::validation::Validator`] first.
    pub fn build(&self, request: &QueryRequest) -> Result<CompiledQuery> {
        let primary = self.compile(request)?;
        let comparison = match comparison_request(request)? {
            Some(shifted) => Some(self.compile(&shifted)?),
            None => None,
        };
        // the shifted request keeps the same fields, so the sets coincide
        let joins = joins::required_joins(&self.catalog, request);
        Ok(CompiledQuery {
            primary,
            comparison,
            joins,
        })
    }

    fn compile(&self, request: &QueryRequest) -> Result<CompiledStatement> {
        render::render_statement(&self.catalog, request)
    }
}
