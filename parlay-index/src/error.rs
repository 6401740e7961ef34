use crate::provider::ProviderError;
use smol_str::SmolStr;
use thiserror::Error;

/// All errors generated while resolving an index.
///
/// None of these escape the public resolve entry points - the
/// [`IndexCompositor`](crate::composite::IndexCompositor) converts every
/// variant into fallback data at the narrowest scope that can absorb it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("index definition not found: {0}")]
    DefinitionNotFound(SmolStr),

    #[error(
        "malformed index definition {id}: {market_count} markets but {code_count} position codes"
    )]
    MalformedDefinition {
        id: SmolStr,
        market_count: usize,
        code_count: usize,
    },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}
