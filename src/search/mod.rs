//! Tantivy index behind the search page.
//!
//! The index lives in RAM and is rebuilt from the mirror whenever the mirror
//! revision has moved since the last build.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::PublicationStatus;
use crate::navigation::{resolve, Destination};
use crate::store::Mirror;

const BOOST_TITLE: f32 = 10.0;
const BOOST_CATEGORY: f32 = 5.0;
const BOOST_BODY: f32 = 3.0;

/// Accent-insensitive tokenizer ("Fête" finds "fete").
const FOLDED_TOKENIZER: &str = "folded";

/// Searchable content kinds, usable as the page's filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Place,
    Event,
    Trail,
    Article,
    Listing,
}

impl SearchKind {
    pub const ALL: [SearchKind; 5] = [
        SearchKind::Place,
        SearchKind::Event,
        SearchKind::Trail,
        SearchKind::Article,
        SearchKind::Listing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Place => "place",
            SearchKind::Event => "event",
            SearchKind::Trail => "trail",
            SearchKind::Article => "article",
            SearchKind::Listing => "listing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    fn destination(&self, id: &str) -> Destination {
        let id = Some(id.to_string());
        match self {
            SearchKind::Place => Destination::PlaceDetail {
                id,
                main_category: None,
                slug: None,
            },
            SearchKind::Event => Destination::EventDetail { id, slug: None },
            SearchKind::Trail => Destination::TrailDetail { id, slug: None },
            SearchKind::Article => Destination::ArticleDetail { id, slug: None },
            SearchKind::Listing => Destination::ListingDetail { id, slug: None },
        }
    }
}

/// One search result, with the path of its page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub kind: SearchKind,
    pub id: String,
    pub title: String,
    pub path: String,
    pub score: f32,
}

struct SearchFields {
    id: Field,
    kind: Field,
    title: Field,
    category: Field,
    body: Field,
}

/// In-memory full-text index over the public directory content.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: SearchFields,
    /// Mirror revision of the last build, `u64::MAX` before the first one.
    built_revision: AtomicU64,
}

impl SearchIndex {
    pub fn new() -> Result<Self, AppError> {
        let text = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(FOLDED_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let kind = schema_builder.add_text_field("kind", STRING | STORED);
        let title = schema_builder.add_text_field("title", text.clone().set_stored());
        let category = schema_builder.add_text_field("category", text.clone());
        let body = schema_builder.add_text_field("body", text);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(
            FOLDED_TOKENIZER,
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .build(),
        );

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer_with_num_threads(1, 20_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields: SearchFields {
                id,
                kind,
                title,
                category,
                body,
            },
            built_revision: AtomicU64::new(u64::MAX),
        })
    }

    /// Rebuild from the mirror unless it is unchanged since the last build.
    pub async fn refresh(&self, mirror: &Mirror) -> Result<(), AppError> {
        let revision = mirror.revision();
        if self.built_revision.load(Ordering::Acquire) == revision {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        // Another caller may have rebuilt while we waited.
        if self.built_revision.load(Ordering::Acquire) == revision {
            return Ok(());
        }

        writer.delete_all_documents()?;
        let mut count = 0usize;
        for document in self.documents(mirror) {
            writer.add_document(document)?;
            count += 1;
        }
        writer.commit()?;
        self.reader.reload()?;

        self.built_revision.store(revision, Ordering::Release);
        tracing::debug!(revision, documents = count, "Search index rebuilt");
        Ok(())
    }

    /// Search the last built index. An empty query yields no hits.
    pub fn search(
        &self,
        mirror: &Mirror,
        query_str: &str,
        kind: Option<SearchKind>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in [
            (self.fields.title, BOOST_TITLE),
            (self.fields.category, BOOST_CATEGORY),
            (self.fields.body, BOOST_BODY),
        ] {
            let parser = QueryParser::for_index(&self.index, vec![field]);
            let (query, errors) = parser.parse_query_lenient(query_str);
            if !errors.is_empty() {
                tracing::debug!("Lenient query parse dropped {} clause(s)", errors.len());
            }
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(query, boost))));
        }
        let text_query: Box<dyn Query> = Box::new(BooleanQuery::new(subqueries));

        let query: Box<dyn Query> = match kind {
            Some(kind) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, text_query),
                (
                    Occur::Must,
                    Box::new(TermQuery::new(
                        Term::from_field_text(self.fields.kind, kind.as_str()),
                        IndexRecordOption::Basic,
                    )),
                ),
            ])),
            None => text_query,
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits = top_docs
            .into_iter()
            .filter_map(|(score, address)| {
                let document: TantivyDocument = searcher.doc(address).ok()?;
                let text = |field: Field| {
                    document
                        .get_first(field)
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                };
                let kind = SearchKind::parse(&text(self.fields.kind)?)?;
                let id = text(self.fields.id)?;
                Some(SearchHit {
                    kind,
                    path: resolve(&kind.destination(&id), mirror),
                    title: text(self.fields.title).unwrap_or_default(),
                    id,
                    score,
                })
            })
            .collect();

        Ok(hits)
    }

    fn documents(&self, mirror: &Mirror) -> Vec<TantivyDocument> {
        let f = &self.fields;
        let published = |status: PublicationStatus| status == PublicationStatus::Published;
        let make = |kind: SearchKind, id: &str, title: &str, category: &str, body: String| {
            doc!(
                f.id => id.to_string(),
                f.kind => kind.as_str().to_string(),
                f.title => title.to_string(),
                f.category => category.to_string(),
                f.body => body
            )
        };

        let mut docs = Vec::new();
        for p in mirror.places.snapshot().iter().filter(|p| published(p.status)) {
            let body = format!("{} {}", p.description, p.address);
            docs.push(make(SearchKind::Place, &p.id, &p.name, &p.category, body));
        }
        for e in mirror.events.snapshot().iter().filter(|e| published(e.status)) {
            docs.push(make(
                SearchKind::Event,
                &e.id,
                &e.title,
                &e.category,
                e.description.clone(),
            ));
        }
        for t in mirror.trails.snapshot().iter().filter(|t| published(t.status)) {
            docs.push(make(SearchKind::Trail, &t.id, &t.name, "", t.description.clone()));
        }
        for a in mirror.articles.snapshot().iter() {
            let body = format!("{} {}", a.excerpt, a.content);
            docs.push(make(SearchKind::Article, &a.id, &a.title, &a.category, body));
        }
        for l in mirror.listings.snapshot().iter().filter(|l| published(l.status)) {
            docs.push(make(
                SearchKind::Listing,
                &l.id,
                &l.title,
                &l.category,
                l.description.clone(),
            ));
        }
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Place};

    fn mirror() -> Mirror {
        let mirror = Mirror::new();
        let places: Vec<Place> = serde_json::from_value(serde_json::json!([
            {
                "id": "p1",
                "slug": "le-belvedere",
                "name": "Le Belvédère",
                "mainCategory": "restaurant",
                "category": "gastronomique",
                "description": "Vue sur le lac"
            },
            {
                "id": "p2",
                "name": "Fromagerie secrète",
                "mainCategory": "commerce",
                "status": "pending"
            }
        ]))
        .unwrap();
        let events: Vec<Event> = serde_json::from_value(serde_json::json!([
            {
                "id": "e1",
                "slug": "fete-du-lac",
                "title": "Fête du Lac",
                "description": "Feux d'artifice sur le lac"
            }
        ]))
        .unwrap();
        mirror.places.apply_fetched(places);
        mirror.events.apply_fetched(events);
        mirror
    }

    #[tokio::test]
    async fn test_search_is_accent_insensitive_and_resolves_paths() {
        let mirror = mirror();
        let index = SearchIndex::new().unwrap();
        index.refresh(&mirror).await.unwrap();

        let hits = index.search(&mirror, "belvedere", None, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, SearchKind::Place);
        assert_eq!(hits[0].path, "/restaurant/le-belvedere");

        let hits = index.search(&mirror, "fete", None, 10).unwrap();
        assert_eq!(hits[0].path, "/evenement/fete-du-lac");
    }

    #[tokio::test]
    async fn test_kind_filter_and_unpublished_content() {
        let mirror = mirror();
        let index = SearchIndex::new().unwrap();
        index.refresh(&mirror).await.unwrap();

        let all = index.search(&mirror, "lac", None, 10).unwrap();
        assert_eq!(all.len(), 2);
        let events = index
            .search(&mirror, "lac", Some(SearchKind::Event), 10)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");

        assert!(index.search(&mirror, "fromagerie", None, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_follows_mirror_revision() {
        let mirror = mirror();
        let index = SearchIndex::new().unwrap();
        index.refresh(&mirror).await.unwrap();
        assert!(index.search(&mirror, "annecy", None, 10).unwrap().is_empty());

        let article = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "title": "Annecy en hiver"
        }))
        .unwrap();
        mirror.articles.append(article);
        index.refresh(&mirror).await.unwrap();

        let hits = index.search(&mirror, "annecy", None, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/article/a1");
    }

    #[test]
    fn test_empty_query() {
        let index = SearchIndex::new().unwrap();
        assert!(index.search(&Mirror::new(), "  ", None, 10).unwrap().is_empty());
    }
}
