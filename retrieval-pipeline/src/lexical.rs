use std::collections::HashMap;

use common::storage::types::vector_record::ChunkDocument;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// In-memory term-frequency ranker over one content item's chunk set.
///
/// Built on demand from the stored documents and discarded after the
/// query; per-movie corpora are small enough that rebuilding beats
/// persisting a second index. Complements vector search with the exact
/// proper-noun and quote matches embeddings under-weight.
pub struct LexicalIndex {
    doc_ids: Vec<String>,
    doc_lengths: Vec<f32>,
    average_length: f32,
    /// term -> (doc position, term frequency)
    postings: HashMap<String, Vec<(usize, f32)>>,
}

impl LexicalIndex {
    pub fn build(documents: &[ChunkDocument]) -> Self {
        let mut doc_ids = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut postings: HashMap<String, Vec<(usize, f32)>> = HashMap::new();

        for (position, document) in documents.iter().enumerate() {
            doc_ids.push(document.id.clone());

            let mut frequencies: HashMap<String, f32> = HashMap::new();
            let mut length = 0.0;
            for token in tokenize(&document.text) {
                *frequencies.entry(token).or_insert(0.0) += 1.0;
                length += 1.0;
            }
            doc_lengths.push(length);

            for (term, frequency) in frequencies {
                postings.entry(term).or_default().push((position, frequency));
            }
        }

        let total: f32 = doc_lengths.iter().sum();
        let average_length = if doc_lengths.is_empty() {
            0.0
        } else {
            total / doc_lengths.len() as f32
        };

        Self {
            doc_ids,
            doc_lengths,
            average_length,
            postings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// BM25-ranked document ids for the query, best first, zero-score
    /// documents excluded. Ties fall back to corpus order so rankings are
    /// stable.
    pub fn search(&self, query: &str, take: usize) -> Vec<String> {
        if self.is_empty() || take == 0 {
            return Vec::new();
        }

        let mut terms = tokenize(query).collect::<Vec<_>>();
        terms.sort_unstable();
        terms.dedup();

        let total_docs = self.doc_ids.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in &terms {
            let Some(entries) = self.postings.get(term) else {
                continue;
            };
            let doc_frequency = entries.len() as f32;
            let idf = (1.0 + (total_docs - doc_frequency + 0.5) / (doc_frequency + 0.5)).ln();

            for &(position, term_frequency) in entries {
                let length_norm =
                    1.0 - BM25_B + BM25_B * self.doc_lengths[position] / self.average_length;
                let contribution = idf * term_frequency * (BM25_K1 + 1.0)
                    / (term_frequency + BM25_K1 * length_norm);
                *scores.entry(position).or_insert(0.0) += contribution;
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(take);

        ranked
            .into_iter()
            .map(|(position, _)| self.doc_ids[position].clone())
            .collect()
    }
}

/// Case-folded word tokens; everything non-alphanumeric separates.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}
