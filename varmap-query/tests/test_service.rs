use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use varmap_core::models::{Mutation, Protein, SnvKey};
use varmap_index::KeyValueIndex;
use varmap_query::{MutationRegistry, QueryError, QueryKind, QueryService};

#[derive(Default)]
struct InMemoryRegistry {
    mutations: RefCell<HashMap<(u32, u32, String), Mutation>>,
}

impl MutationRegistry for InMemoryRegistry {
    fn get_or_create(&self, protein: &Protein, position: u32, alt: &str) -> anyhow::Result<(Mutation, bool)> {
        let mut mutations = self.mutations.borrow_mut();
        let key = (protein.id, position, alt.to_string());
        if let Some(existing) = mutations.get(&key) {
            return Ok((existing.clone(), false));
        }

        let mutation = Mutation {
            id: mutations.len() as u64 + 1,
            protein_id: protein.id,
            position,
            alt: alt.to_string(),
        };
        mutations.insert(key, mutation.clone());
        Ok((mutation, true))
    }
}

struct FailingRegistry;

impl MutationRegistry for FailingRegistry {
    fn get_or_create(&self, _: &Protein, _: u32, _: &str) -> anyhow::Result<(Mutation, bool)> {
        anyhow::bail!("database is down")
    }
}

struct Stores {
    genomic: KeyValueIndex<String>,
    genes: KeyValueIndex<u32>,
    proteins: HashMap<u32, Protein>,
    _dir: TempDir,
}

#[fixture]
fn stores() -> Stores {
    let dir = tempfile::tempdir().unwrap();

    let mut genomic: KeyValueIndex<String> = KeyValueIndex::new(dir.path().join("genomic"));
    genomic.open(100).unwrap();
    let key = SnvKey::parse("20", "14370", "G", "A").unwrap().to_bytes();
    let mut session = genomic.scoped_write_session().unwrap();
    for record in [
        "+,A,V,39,EX1,7,1",
        "+,A,V,39,EX2,7,1",
        "-,R,W,100,4,2,0",
        "not a record",
    ] {
        session.add(key, record.to_string()).unwrap();
    }
    session.finish().unwrap();

    let mut genes: KeyValueIndex<u32> = KeyValueIndex::new(dir.path().join("genes"));
    genes.open(100).unwrap();
    genes.add("TP53 R34W", 2).unwrap();
    genes.add("CDH23 F561L", 1).unwrap();
    genes.add("CDH23 F561L", 99).unwrap();

    let proteins = [
        Protein::new(7, "NM_007", "GENE7", "MAAAAAAAAAAAAAAA").with_sites(vec![13]),
        Protein::new(2, "NM_000546", "TP53", "MEEP"),
        Protein::new(1, "NM_001171933", "CDH23", "MQV"),
    ]
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

    Stores {
        genomic,
        genes,
        proteins,
        _dir: dir,
    }
}

#[rstest]
fn test_search_genomic(stores: Stores) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);

    let results = service.search_genomic("chr20", "14370", "G", "A").unwrap();
    // the two exon records of protein 7 describe the same change
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].protein.id, 2);
    assert_eq!(results[0].aa_pos, 34);
    assert_eq!(results[0].aa_alt, "W");

    let hit = &results[1];
    assert_eq!(hit.protein.refseq, "NM_007");
    assert_eq!(hit.kind, QueryKind::Genomic);
    assert_eq!((hit.aa_ref.as_str(), hit.aa_pos, hit.aa_alt.as_str()), ("A", 13, "V"));
    assert_eq!(hit.mutation.position, 13);
    assert!(hit.is_mutation_novel);
    assert_eq!(hit.consequence.as_ref().unwrap().exon, "EX1");

    // the chromosome prefix is optional and the mutation now exists
    let again = service.search_genomic("20", "14370", "g", "a").unwrap();
    assert_eq!(again.len(), 2);
    assert!(again.iter().all(|r| !r.is_mutation_novel));
    assert_eq!(again[1].mutation, hit.mutation);
}

#[rstest]
#[case("chr20", "14371", "G", "A")]
#[case("chr20", "14370", "G", "C")]
#[case("chr99", "14370", "G", "A")]
#[case("chr20", "pos", "G", "A")]
#[case("chr20", "14370", "GA", "A")]
fn test_search_genomic_misses_are_empty(
    stores: Stores,
    #[case] chrom: &str,
    #[case] pos: &str,
    #[case] r: &str,
    #[case] a: &str,
) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);
    assert!(service.search_genomic(chrom, pos, r, a).unwrap().is_empty());
}

#[rstest]
fn test_search_proteomic(stores: Stores) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);

    // protein 99 is not known to the repository
    let results = service.search_proteomic("cdh23", "f", 561, "l").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].protein.gene_name, "CDH23");
    assert_eq!(results[0].kind, QueryKind::Proteomic);
    assert_eq!(results[0].aa_alt, "L");
    assert_eq!(results[0].consequence, None);

    assert!(service.search_proteomic("CDH23", "F", 562, "L").unwrap().is_empty());
}

#[rstest]
#[case("p.R34W", 1)]
#[case("R34W", 1)]
#[case("R34", 0)]
#[case("34W", 0)]
fn test_search_proteomic_text(stores: Stores, #[case] change: &str, #[case] hits: usize) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);
    assert_eq!(service.search_proteomic_text("TP53", change).unwrap().len(), hits);
}

#[rstest]
fn test_search_text(stores: Stores) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);

    let report = service
        .search_text("chr20 14370 G A,T\nTP53 R34W\nnot a query\n\nchr20 14370 G A\ntp53 r34w\n")
        .unwrap();

    let queries: Vec<(&str, u32, usize)> = report
        .queries
        .iter()
        .map(|q| (q.query.as_str(), q.count, q.results.len()))
        .collect();
    assert_eq!(
        queries,
        vec![
            ("chr20 14370 G A", 2, 2),
            ("chr20 14370 G T", 1, 0),
            ("TP53 R34W", 2, 1),
        ]
    );
    assert_eq!(report.badly_formatted, vec!["not a query"]);
    assert_eq!(report.results().count(), 3);
}

#[rstest]
fn test_search_vcf(stores: Stores) {
    let registry = InMemoryRegistry::default();
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &registry);

    let vcf = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\n20\t14370\trs6054257\tG\tA,C\t29\tPASS\n20\t1\n";
    let report = service.search_vcf(Cursor::new(vcf)).unwrap();

    assert_eq!(report.get("chr20 14370 G A").unwrap().results.len(), 2);
    assert!(report.get("chr20 14370 G C").unwrap().results.is_empty());
    assert_eq!(report.badly_formatted, vec!["20\t1"]);
}

#[rstest]
fn test_collaborator_failure(stores: Stores) {
    let service = QueryService::new(&stores.genomic, &stores.genes, &stores.proteins, &FailingRegistry);
    let result = service.search_genomic("chr20", "14370", "G", "A");
    assert!(matches!(result, Err(QueryError::Collaborator(_))));

    // nothing to materialize, nothing to fail
    assert!(service.search_genomic("chr20", "1", "G", "A").unwrap().is_empty());
}
