use webqa_chunker::Chunk;
use webqa_search::RetrievalResult;

/// Formats retrieved chunks into the context handed to the generator.
///
/// Each chunk becomes a block:
///
/// ```text
/// Source: <source>
/// Title: <title>
///
/// <text>
/// ```
///
/// Blocks are joined by a blank line and keep retrieval order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    #[must_use]
    pub fn assemble(&self, results: &[RetrievalResult]) -> String {
        results
            .iter()
            .map(|result| Self::block(&result.chunk))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[must_use]
    pub fn block(chunk: &Chunk) -> String {
        format!(
            "Source: {}\nTitle: {}\n\n{}",
            chunk.source, chunk.title, chunk.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(id: usize, text: &str, score: f32) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk::new(
                text.to_string(),
                "https://example.com/faq".to_string(),
                "FAQ".to_string(),
                id,
                0,
            ),
            score,
        }
    }

    #[test]
    fn blocks_keep_retrieval_order() {
        let context = ContextAssembler.assemble(&[
            result(3, "Parking is free after six.", 0.2),
            result(0, "The shop opens at nine.", 0.4),
        ]);
        assert_eq!(
            context,
            "Source: https://example.com/faq\nTitle: FAQ\n\nParking is free after six.\n\n\
             Source: https://example.com/faq\nTitle: FAQ\n\nThe shop opens at nine."
        );
    }

    #[test]
    fn no_results_means_empty_context() {
        assert_eq!(ContextAssembler.assemble(&[]), "");
    }
}
