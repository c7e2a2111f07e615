//! Behavioural tests of the annotation engine.
//!
//! These exercise the library through its public API: overlap selection,
//! priority rules, chromosome-ordered merging and output ordering.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::io::BufReader;

use bedanno::config::{AnnotationFormat, Config, SENTINEL};
use bedanno::error::{AnnotateError, StreamKind};
use bedanno::matcher::priority::{compare, select_best, PriorityKey};
use bedanno::matcher::{annotate_streams, Annotator, ChromosomeIndex, FeatureIndex, MergeDriver};
use bedanno::parser::{BedReader, GtfReader};
use bedanno::types::{
    ConfidenceLevel, Feature, FeatureType, Interval, Region, TranscriptSupportLevel,
};

// -------------------------------------------------------------------------
// Helper functions
// -------------------------------------------------------------------------

fn region(chrom: &str, start: u64, end: u64) -> Region {
    Region::new(chrom.to_string(), start, end, vec![])
}

fn feature(chrom: &str, start: u64, end: u64, feature_type: FeatureType, name: &str) -> Feature {
    Feature::new(chrom, start, end, feature_type, name)
}

/// Annotate in memory and return `(region id, gene)` pairs in emission order.
fn annotate(queries: &[Region], features: &[Feature]) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    annotate_streams(
        queries.iter().cloned().map(Ok),
        features.iter().cloned().map(Ok),
        &Config::default(),
        |region, gene| {
            out.push((region.id(), gene.to_string()));
            Ok(())
        },
    )?;
    Ok(out)
}

fn reorder_of(err: &anyhow::Error) -> Option<(String, StreamKind)> {
    match err.downcast_ref::<AnnotateError>()? {
        AnnotateError::ChromosomeReorder { chromosome, stream } => {
            Some((chromosome.clone(), *stream))
        }
        _ => None,
    }
}

fn varied_features(chrom: &str, rng: &mut StdRng, n: usize) -> Vec<Feature> {
    let types = [
        FeatureType::Cds,
        FeatureType::StopCodon,
        FeatureType::StartCodon,
        FeatureType::Utr,
        FeatureType::Exon,
        FeatureType::Transcript,
        FeatureType::Gene,
        FeatureType::Other,
    ];
    let tsls = [
        TranscriptSupportLevel::One,
        TranscriptSupportLevel::Three,
        TranscriptSupportLevel::Na,
    ];
    (0..n)
        .map(|i| {
            let start = rng.gen_range(0..5_000);
            let len = rng.gen_range(1..=800);
            let mut f = feature(
                chrom,
                start,
                start + len,
                types[rng.gen_range(0..types.len())],
                &format!("G{}", i % 17),
            );
            f.transcript_id = format!("T{}", i);
            f.mane_select = rng.gen_bool(0.2);
            f.tsl = tsls[rng.gen_range(0..tsls.len())];
            f.confidence = match rng.gen_range(0..4) {
                0 => None,
                1 => Some(ConfidenceLevel::One),
                2 => Some(ConfidenceLevel::Two),
                _ => Some(ConfidenceLevel::Three),
            };
            if rng.gen_bool(0.5) {
                f.transcript_type = "protein_coding".to_string();
            }
            f
        })
        .collect()
}

fn varied_regions(chrom: &str, rng: &mut StdRng, n: usize) -> Vec<Region> {
    (0..n)
        .map(|_| {
            let start = rng.gen_range(0..6_000);
            region(chrom, start, start + rng.gen_range(1..=300))
        })
        .collect()
}

// -------------------------------------------------------------------------
// 1. Cardinality and ordering
// -------------------------------------------------------------------------

mod test_cardinality {
    use super::*;

    #[test]
    fn test_one_output_per_query_in_input_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut queries = varied_regions("chr1", &mut rng, 40);
        queries.extend(varied_regions("chr2", &mut rng, 25));
        queries.extend(varied_regions("chr3", &mut rng, 10));
        let mut features = varied_features("chr1", &mut rng, 200);
        features.extend(varied_features("chr2", &mut rng, 100));

        let out = annotate(&queries, &features).unwrap();

        assert_eq!(out.len(), queries.len());
        for (q, (id, _)) in queries.iter().zip(&out) {
            assert_eq!(&q.id(), id);
        }
    }

    #[test]
    fn test_duplicate_queries_each_get_output() {
        let queries = vec![region("chr1", 10, 20), region("chr1", 10, 20)];
        let features = vec![feature("chr1", 0, 100, FeatureType::Gene, "A")];
        let out = annotate(&queries, &features).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|(_, gene)| gene == "A"));
    }

    #[test]
    fn test_empty_query_stream_yields_nothing() {
        let features = vec![feature("chr1", 0, 100, FeatureType::Gene, "A")];
        assert!(annotate(&[], &features).unwrap().is_empty());
    }
}

// -------------------------------------------------------------------------
// 2. Sentinel
// -------------------------------------------------------------------------

mod test_sentinel {
    use super::*;

    #[test]
    fn test_no_overlap_gets_sentinel() {
        let features = vec![
            feature("chr1", 0, 10, FeatureType::Gene, "LEFT"),
            feature("chr1", 20, 30, FeatureType::Cds, "RIGHT"),
        ];
        // half-open: [10, 20) touches both neighbours without overlapping
        let out = annotate(&[region("chr1", 10, 20)], &features).unwrap();
        assert_eq!(out[0].1, SENTINEL);
    }

    #[test]
    fn test_unknown_chromosome_gets_sentinel() {
        let features = vec![feature("chr1", 0, 100, FeatureType::Gene, "A")];
        let out = annotate(&[region("chrUn", 0, 100)], &features).unwrap();
        assert_eq!(out[0].1, ".");
    }

    #[test]
    fn test_empty_annotation_gets_sentinel() {
        let out = annotate(&[region("chr1", 0, 100), region("chr2", 0, 1)], &[]).unwrap();
        assert!(out.iter().all(|(_, gene)| gene == SENTINEL));
    }

    #[test]
    fn test_zero_length_query_gets_sentinel() {
        let features = vec![feature("chr1", 0, 100, FeatureType::Gene, "A")];
        let out = annotate(&[region("chr1", 50, 50)], &features).unwrap();
        assert_eq!(out[0].1, SENTINEL);
    }
}

// -------------------------------------------------------------------------
// 3. Priority rules
// -------------------------------------------------------------------------

mod test_priority {
    use super::*;

    #[test]
    fn test_example_scenario() {
        let features = vec![
            feature("chr1", 0, 200, FeatureType::Gene, "GENEA"),
            feature("chr1", 5, 45, FeatureType::Exon, "GENEA"),
        ];
        let mut index = ChromosomeIndex::new();
        features.iter().cloned().for_each(|f| index.insert(f));
        index.build();

        let winner = Annotator::best_match(&region("chr1", 10, 50), &index).unwrap();
        assert_eq!(winner.feature_type, FeatureType::Exon);
        assert_eq!(winner.gene_name, "GENEA");

        let out = annotate(&[region("chr1", 10, 50), region("chr1", 400, 500)], &features).unwrap();
        assert_eq!(out[0].1, "GENEA");
        assert_eq!(out[1].1, ".");
    }

    #[test]
    fn test_cds_dominates_gene_regardless_of_other_attributes() {
        let query = Interval::new(100, 200);
        let mut gene = feature("chr1", 0, 1000, FeatureType::Gene, "G");
        gene.mane_select = true;
        gene.tsl = TranscriptSupportLevel::One;
        gene.confidence = Some(ConfidenceLevel::One);
        gene.transcript_type = "protein_coding".to_string();
        let cds = feature("chr1", 199, 200, FeatureType::Cds, "C");

        assert_eq!(compare(&cds, &gene, &query), Ordering::Greater);
        assert_eq!(select_best([&gene, &cds], &query).unwrap().gene_name, "C");
    }

    #[test]
    fn test_full_type_order() {
        let query = Interval::new(0, 10);
        let ordered = [
            FeatureType::Cds,
            FeatureType::StopCodon,
            FeatureType::StartCodon,
            FeatureType::Utr,
            FeatureType::Exon,
            FeatureType::Transcript,
            FeatureType::Gene,
            FeatureType::Other,
        ];
        for pair in ordered.windows(2) {
            let better = feature("chr1", 0, 1, pair[0], "A");
            let worse = feature("chr1", 0, 10, pair[1], "B");
            assert_eq!(compare(&better, &worse, &query), Ordering::Greater, "{:?}", pair);
        }
    }

    #[test]
    fn test_overlap_fraction_is_last_resort() {
        let query = Interval::new(100, 200);
        let small = feature("chr1", 150, 200, FeatureType::Exon, "SMALL");
        let large = feature("chr1", 90, 190, FeatureType::Exon, "LARGE");

        let ks = PriorityKey::new(&small, &query);
        let kl = PriorityKey::new(&large, &query);
        assert_eq!(ks.overlap_fraction(&query), 0.5);
        assert_eq!(kl.overlap_fraction(&query), 0.9);
        assert_eq!(select_best([&small, &large], &query).unwrap().gene_name, "LARGE");

        let mut coding_small = small.clone();
        coding_small.transcript_type = "protein_coding".to_string();
        assert_eq!(select_best([&coding_small, &large], &query).unwrap().gene_name, "SMALL");
    }

    #[test]
    fn test_equal_fraction_tie_is_deterministic() {
        let query = Interval::new(100, 200);
        let a = feature("chr1", 50, 150, FeatureType::Exon, "A");
        let b = feature("chr1", 150, 250, FeatureType::Exon, "B");
        assert_eq!(compare(&a, &b, &query), Ordering::Equal);

        let first = select_best([&a, &b], &query).unwrap().gene_name.clone();
        let second = select_best([&b, &a], &query).unwrap().gene_name.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_winner_invariant_to_candidate_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let features = varied_features("chr1", &mut rng, 60);
        let query = Interval::new(0, 6_000);
        let expected = select_best(&features, &query).unwrap().clone();

        for _ in 0..20 {
            let mut shuffled: Vec<&Feature> = features.iter().collect();
            shuffled.shuffle(&mut rng);
            let winner = select_best(shuffled, &query).unwrap();
            assert_eq!(winner, &expected);
        }
    }
}

// -------------------------------------------------------------------------
// 4. Chromosome ordering contract
// -------------------------------------------------------------------------

mod test_reorder {
    use super::*;

    #[test]
    fn test_feature_chromosome_reentry_is_fatal() {
        let queries = vec![region("chr1", 0, 10), region("chr2", 0, 10)];
        let features = vec![
            feature("chr1", 0, 100, FeatureType::Gene, "A"),
            feature("chr2", 0, 100, FeatureType::Gene, "B"),
            feature("chr1", 0, 100, FeatureType::Cds, "LATE"),
        ];

        let mut emitted = Vec::new();
        let err = annotate_streams(
            queries.into_iter().map(Ok),
            features.into_iter().map(Ok),
            &Config::default(),
            |region, gene| {
                emitted.push((region.chrom.clone(), gene.to_string()));
                Ok(())
            },
        )
        .unwrap_err();

        assert_eq!(reorder_of(&err), Some(("chr1".to_string(), StreamKind::Feature)));
        // chr1 was answered from its first block only and never re-opened
        assert_eq!(emitted, vec![("chr1".to_string(), "A".to_string())]);
    }

    #[test]
    fn test_query_chromosome_reentry_is_fatal() {
        let queries = vec![region("chr1", 0, 10), region("chr2", 0, 10), region("chr1", 5, 6)];
        let err = annotate(&queries, &[]).unwrap_err();
        assert_eq!(reorder_of(&err), Some(("chr1".to_string(), StreamKind::Query)));
    }

    #[test]
    fn test_error_message_names_chromosome_and_stream() {
        let queries = vec![region("chr1", 0, 10), region("chr2", 0, 10), region("chr1", 5, 6)];
        let message = annotate(&queries, &[]).unwrap_err().to_string();
        assert!(message.contains("chr1"));
        assert!(message.contains("BED"));
    }

    #[test]
    fn test_different_chromosome_orders_are_fine() {
        let queries = vec![region("chrX", 0, 10), region("chr1", 0, 10), region("chr2", 0, 10)];
        let features = vec![
            feature("chr2", 0, 100, FeatureType::Gene, "B"),
            feature("chr1", 0, 100, FeatureType::Gene, "A"),
            feature("chrX", 0, 100, FeatureType::Gene, "X"),
        ];
        let genes: Vec<String> = annotate(&queries, &features)
            .unwrap()
            .into_iter()
            .map(|(_, g)| g)
            .collect();
        assert_eq!(genes, vec!["X", "A", "B"]);
    }

    #[test]
    fn test_matching_order_keeps_buffer_small() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut queries = Vec::new();
        let mut features = Vec::new();
        for chrom in ["chr1", "chr2", "chr3", "chr4", "chr5"] {
            queries.extend(varied_regions(chrom, &mut rng, 10));
            features.extend(varied_features(chrom, &mut rng, 50));
        }

        let mut driver = MergeDriver::new(
            queries.into_iter().map(Ok),
            features.into_iter().map(Ok),
        );
        while driver.next_batch().unwrap().is_some() {}
        let stats = driver.stats();
        assert_eq!(stats.chromosomes, 5);
        assert_eq!(stats.features, 250);
        assert!(stats.peak_buffered_chromosomes <= 2);
    }
}

// -------------------------------------------------------------------------
// 5. Sorted vs. unsorted equivalence
// -------------------------------------------------------------------------

mod test_sort_equivalence {
    use super::*;

    #[test]
    fn test_position_order_within_chromosome_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut features = Vec::new();
        let mut queries = Vec::new();
        for chrom in ["chr1", "chr2"] {
            features.extend(varied_features(chrom, &mut rng, 150));
            queries.extend(varied_regions(chrom, &mut rng, 50));
        }

        let mut sorted = features.clone();
        sorted.sort_by(|a, b| {
            a.chrom
                .cmp(&b.chrom)
                .then(a.interval.start.cmp(&b.interval.start))
        });
        let baseline = annotate(&queries, &sorted).unwrap();

        for _ in 0..5 {
            let mut shuffled = Vec::new();
            for chrom in ["chr1", "chr2"] {
                let mut block: Vec<Feature> =
                    features.iter().filter(|f| f.chrom == chrom).cloned().collect();
                block.shuffle(&mut rng);
                shuffled.extend(block);
            }
            assert_eq!(annotate(&queries, &shuffled).unwrap(), baseline);
        }
    }

    #[test]
    fn test_index_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(99);
        let features = varied_features("chr1", &mut rng, 300);
        let mut buffered = FeatureIndex::new();
        features.iter().cloned().for_each(|f| buffered.insert(f));
        let mut index = buffered.evict("chr1").unwrap();
        index.build();

        for q in varied_regions("chr1", &mut rng, 100) {
            let mut expected: Vec<&str> = features
                .iter()
                .filter(|f| f.interval.overlaps(&q.interval))
                .map(|f| f.transcript_id.as_str())
                .collect();
            let mut actual: Vec<&str> = index
                .query_overlaps(&q.interval)
                .into_iter()
                .map(|f| f.transcript_id.as_str())
                .collect();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected, "query {}", q.id());
        }
    }
}

// -------------------------------------------------------------------------
// 6. Parsers feeding the engine
// -------------------------------------------------------------------------

mod test_parsed_inputs {
    use super::*;

    #[test]
    fn test_gtf_and_bed_readers_end_to_end() {
        let gtf = "chr1\tHAVANA\tgene\t1\t200\t.\t+\t.\tgene_id \"G1\"; gene_name \"GENEA\"; level 2;\n\
                   chr1\tHAVANA\texon\t6\t45\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"GENEA\"; level 2;\n\
                   chr1\tHAVANA\tCDS\t301\t400\t.\t+\t0\tgene_id \"G2\"; transcript_id \"T2\"; gene_name \"GENEB\";\n";
        let bed = "chr1\t10\t50\tpeak1\nchr1\t400\t500\tpeak2\nchr1\t350\t360\tpeak3\n";

        let config = Config::default();
        let features = GtfReader::new(BufReader::new(gtf.as_bytes()), AnnotationFormat::Gtf, &config);
        let regions = BedReader::new(BufReader::new(bed.as_bytes()));

        let mut out = Vec::new();
        let summary = annotate_streams(regions, features, &config, |region, gene| {
            out.push(format!("{}\t{}", region.metadata[0], gene));
            Ok(())
        })
        .unwrap();

        assert_eq!(out, vec!["peak1\tGENEA", "peak2\t.", "peak3\tGENEB"]);
        assert_eq!(summary.annotator.regions, 3);
        assert_eq!(summary.annotator.matched, 2);
        assert_eq!(summary.driver.features, 3);
    }

    #[test]
    fn test_ensembl_utr_outranks_enclosing_gene() {
        let gtf = "1\tensembl\tgene\t1\t1000\t.\t+\t.\tgene_id \"G1\"; gene_name \"GENEA\"; gene_biotype \"protein_coding\";\n\
                   1\tensembl\tfive_prime_utr\t101\t200\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\"; gene_name \"GENEB\";\n";

        let config = Config::default();
        let features = GtfReader::new(BufReader::new(gtf.as_bytes()), AnnotationFormat::Gtf, &config);
        let regions = BedReader::new(BufReader::new("1\t120\t150\n".as_bytes()));

        let mut winners = Vec::new();
        annotate_streams(regions, features, &config, |_, gene| {
            winners.push(gene.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(winners, vec!["GENEB"]);
    }

    #[test]
    fn test_parse_error_aborts_run() {
        let config = Config::default();
        let features = GtfReader::new(BufReader::new("".as_bytes()), AnnotationFormat::Gtf, &config);
        let regions = BedReader::new(BufReader::new("chr1\t10\t50\nchr1\t80\t70\n".as_bytes()));

        let mut emitted = 0;
        let err = annotate_streams(regions, features, &config, |_, _| {
            emitted += 1;
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AnnotateError>(),
            Some(AnnotateError::MalformedInterval { start: 80, end: 70, .. })
        ));
        // the malformed record is in the first block, so nothing was emitted
        assert_eq!(emitted, 0);
    }
}
