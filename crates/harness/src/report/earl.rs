//! W3C EARL 1.0 report in Turtle

use async_trait::async_trait;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, Subject, Term, TripleRef};
use oxttl::TurtleSerializer;
use std::path::{Path, PathBuf};

use super::{write_report, ReportFormat, ReportSink, SubjectInfo};
use crate::aggregate::{summarize, RunSummary};
use crate::error::{HarnessError, HarnessResult};
use crate::executor::TestResult;

const PREFIXES: &[(&str, &str)] = &[
    ("earl", EARL),
    ("doap", DOAP),
    ("dc", DC),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

const EARL: &str = "http://www.w3.org/ns/earl#";
const DOAP: &str = "http://usefulinc.com/ns/doap#";
const DC: &str = "http://purl.org/dc/terms/";

const HARNESS_NAME: &str = "LWS Protocol Test Suite";
const HARNESS_HOMEPAGE: &str = "https://github.com/linkedwebstorage/test-suite";
const TEST_NAMESPACE: &str = "https://w3c.github.io/lws-protocol/tests#";
const SCHEMA_DURATION: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://schema.org/duration");

pub struct EarlReporter {
    subject: SubjectInfo,
    assertions: Vec<TestResult>,
}

impl EarlReporter {
    pub fn new(subject: SubjectInfo) -> Self {
        Self {
            subject,
            assertions: Vec::new(),
        }
    }

    /// Counts over everything added so far
    pub fn summary(&self) -> RunSummary {
        summarize(&self.assertions)
    }

    /// Serialize the harness, the subject and one assertion per result
    pub fn render(&self) -> HarnessResult<String> {
        let graph = self.graph()?;

        let mut serializer = TurtleSerializer::new();
        for (prefix, iri) in PREFIXES {
            serializer = serializer.with_prefix(*prefix, *iri).map_err(earl_error)?;
        }

        let mut writer = serializer.for_writer(Vec::new());
        for (subject, predicate, object) in &graph {
            writer
                .serialize_triple(TripleRef::new(subject, predicate, object))
                .map_err(earl_error)?;
        }
        let bytes = writer.finish().map_err(earl_error)?;
        String::from_utf8(bytes).map_err(earl_error)
    }

    fn graph(&self) -> HarnessResult<Vec<(Subject, NamedNode, Term)>> {
        let mut graph = Graph::default();

        let harness = BlankNode::new_unchecked("harness");
        graph.push(&harness, rdf::TYPE.into_owned(), earl("Software"));
        graph.push(&harness, rdf::TYPE.into_owned(), doap("Project"));
        graph.push(&harness, doap("name"), Literal::new_simple_literal(HARNESS_NAME));
        graph.push(&harness, doap("homepage"), iri(HARNESS_HOMEPAGE)?);

        let subject = BlankNode::new_unchecked("subject");
        graph.push(&subject, rdf::TYPE.into_owned(), earl("TestSubject"));
        graph.push(&subject, rdf::TYPE.into_owned(), doap("Project"));
        graph.push(&subject, doap("name"), Literal::new_simple_literal(&self.subject.name));
        if !self.subject.homepage.is_empty() {
            graph.push(&subject, doap("homepage"), iri(&self.subject.homepage)?);
        }
        if !self.subject.version.is_empty() {
            let release = BlankNode::new_unchecked("release");
            graph.push(&subject, doap("release"), release.clone());
            graph.push(
                &release,
                doap("revision"),
                Literal::new_simple_literal(&self.subject.version),
            );
        }

        for (index, assertion) in self.assertions.iter().enumerate() {
            let node = BlankNode::new_unchecked(format!("assertion{}", index));
            let result = BlankNode::new_unchecked(format!("result{}", index));
            let test = iri(&format!("{}{}", TEST_NAMESPACE, assertion.test.id))?;

            graph.push(&node, rdf::TYPE.into_owned(), earl("Assertion"));
            graph.push(&node, earl("assertedBy"), harness.clone());
            graph.push(&node, earl("subject"), subject.clone());
            graph.push(&node, earl("test"), test);
            graph.push(&node, earl("result"), result.clone());

            graph.push(&result, rdf::TYPE.into_owned(), earl("TestResult"));
            graph.push(&result, earl("outcome"), earl(assertion.outcome.as_str()));
            graph.push(
                &result,
                dc("date"),
                Literal::new_typed_literal(
                    assertion.timestamp.to_rfc3339(),
                    xsd::DATE_TIME.into_owned(),
                ),
            );
            graph.push(
                &result,
                SCHEMA_DURATION.into_owned(),
                Literal::new_typed_literal(
                    assertion.duration_ms.to_string(),
                    xsd::INTEGER.into_owned(),
                ),
            );
            if let Some(error) = &assertion.error {
                graph.push(&result, dc("description"), Literal::new_simple_literal(error));
            }
        }

        Ok(graph.triples)
    }
}

#[derive(Default)]
struct Graph {
    triples: Vec<(Subject, NamedNode, Term)>,
}

impl Graph {
    fn push(&mut self, subject: &BlankNode, predicate: NamedNode, object: impl Into<Term>) {
        self.triples.push((subject.clone().into(), predicate, object.into()));
    }
}

#[async_trait]
impl ReportSink for EarlReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Earl
    }

    fn add_result(&mut self, result: &TestResult) {
        self.assertions.push(result.clone());
    }

    async fn generate_report(&self, output_path: &Path) -> HarnessResult<PathBuf> {
        write_report(output_path, &self.render()?).await
    }
}

fn earl(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{}{}", EARL, local))
}

fn doap(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{}{}", DOAP, local))
}

fn dc(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{}{}", DC, local))
}

fn iri(value: &str) -> HarnessResult<NamedNode> {
    NamedNode::new(value).map_err(|e| earl_error(format!("invalid IRI {:?}: {}", value, e)))
}

fn earl_error(e: impl ToString) -> HarnessError {
    HarnessError::reporter(ReportFormat::Earl, e)
}
