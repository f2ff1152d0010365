//! Region processor behavior with hand-written collaborators.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use candidate_regions::core::types::{parse_cigar, Candidate, GvcfRecord, Label, Read, Variant};
use candidate_regions::parsing::fasta::InMemoryReference;
use candidate_regions::parsing::vcf::PopulationVcf;
use candidate_regions::processing::allele_counter::AlleleCounter;
use candidate_regions::processing::caller::ThresholdCaller;
use candidate_regions::processing::options::{Mode, ProcessorOptions};
use candidate_regions::processing::processor::{candidates_in_region, create_pileup_examples};
use candidate_regions::processing::sources::{
    HaplotypeAlignments, InMemoryReads, Labeler, PileupImage, PileupImageCreator,
    PopulationSource, ProcessorFactory, ReadSource, RealignmentInfo, Realigner, Resources, SourceError,
    VariantCaller,
};
use candidate_regions::processing::{process_regions, ProcessError, RegionProcessor};
use candidate_regions::Interval;

const SAMPLE: &str = "sample_id";

fn chr1() -> String {
    "ACGT".repeat(50)
}

fn read(name: &str, start: u64, sequence: &str) -> Read {
    Read {
        fragment_name: name.to_string(),
        read_number: 0,
        contig: "chr1".to_string(),
        start,
        mapping_quality: 60,
        cigar: parse_cigar(&format!("{}M", sequence.len())).unwrap(),
        sequence: sequence.as_bytes().to_vec(),
        qualities: vec![30; sequence.len()],
    }
}

fn region() -> Interval {
    Interval::new("chr1", 0, 100).unwrap()
}

fn candidate(start: u64) -> Candidate {
    Candidate::new(Variant::new("chr1", start, "A", ["C"]))
}

fn label(start: u64, genotype: Vec<i32>) -> Label {
    Label {
        is_confident: true,
        variant: Variant::new("chr1", start, "A", ["C"]),
        genotype,
    }
}

#[derive(Default, Clone)]
struct Calls {
    reads_queries: Rc<RefCell<Vec<Interval>>>,
    realigned: Rc<RefCell<Vec<(usize, Interval)>>>,
    caller: Rc<RefCell<Vec<(usize, bool)>>>,
    pileup: Rc<RefCell<Vec<(u64, usize)>>>,
    haplotypes: Rc<RefCell<Vec<(BTreeMap<String, String>, Option<HaplotypeAlignments>)>>>,
    aligned: Rc<RefCell<Vec<(String, Interval)>>>,
    labeler: Rc<RefCell<Vec<(usize, Interval)>>>,
}

struct FakeReads {
    reads: Vec<Read>,
    calls: Calls,
}

impl ReadSource for FakeReads {
    fn query(&self, region: &Interval) -> Result<Vec<Read>, SourceError> {
        self.calls.reads_queries.borrow_mut().push(region.clone());
        Ok(self.reads.iter().filter(|r| r.overlaps(region)).cloned().collect())
    }
}

struct FakeRealigner {
    calls: Calls,
}

impl Realigner for FakeRealigner {
    fn realign_reads(
        &mut self,
        reads: Vec<Read>,
        region: &Interval,
    ) -> Result<(Vec<Read>, RealignmentInfo), SourceError> {
        self.calls.realigned.borrow_mut().push((reads.len(), region.clone()));
        Ok((reads, RealignmentInfo::default()))
    }

    /// Keeps the reads whose first base matches the haplotype's first base.
    fn align_to_haplotype(
        &self,
        haplotype: &str,
        reads: &[Read],
        window: &Interval,
    ) -> Result<Vec<Read>, SourceError> {
        self.calls
            .aligned
            .borrow_mut()
            .push((haplotype.to_string(), window.clone()));
        let first = haplotype.as_bytes().first();
        Ok(reads
            .iter()
            .filter(|r| r.sequence.first() == first)
            .cloned()
            .collect())
    }
}

struct FakeCaller {
    candidates: Vec<Candidate>,
    gvcf_records: Vec<GvcfRecord>,
    calls: Calls,
}

impl VariantCaller for FakeCaller {
    fn calls_and_gvcfs(
        &self,
        counter: &AlleleCounter<'_>,
        include_gvcfs: bool,
    ) -> Result<(Vec<Candidate>, Vec<GvcfRecord>), SourceError> {
        self.calls
            .caller
            .borrow_mut()
            .push((counter.reads_counted(), include_gvcfs));
        let gvcf_records = if include_gvcfs {
            self.gvcf_records.clone()
        } else {
            Vec::new()
        };
        Ok((self.candidates.clone(), gvcf_records))
    }
}

/// Images per candidate start; starts not listed get no images.
struct FakePileup {
    images: BTreeMap<u64, Vec<PileupImage>>,
    calls: Calls,
}

impl PileupImageCreator for FakePileup {
    fn create_pileup_images(
        &self,
        candidate: &Candidate,
        reads_for_samples: &[Vec<Read>],
        haplotype_alignments: Option<&HaplotypeAlignments>,
        haplotype_sequences: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<Vec<PileupImage>>, SourceError> {
        self.calls.haplotypes.borrow_mut().push((
            haplotype_sequences.cloned().unwrap_or_default(),
            haplotype_alignments.cloned(),
        ));
        let num_reads = reads_for_samples.iter().map(Vec::len).sum();
        self.calls
            .pileup
            .borrow_mut()
            .push((candidate.variant.start, num_reads));
        Ok(self.images.get(&candidate.variant.start).cloned())
    }

    fn image_shape(&self) -> Vec<usize> {
        vec![5, 5, 7]
    }

    fn image_format(&self) -> &str {
        "raw"
    }
}

struct FakeLabeler {
    labels: Vec<(Candidate, Label)>,
    calls: Calls,
}

impl Labeler for FakeLabeler {
    fn label_candidates(
        &mut self,
        candidates: &[Candidate],
        region: &Interval,
    ) -> Result<Vec<(Candidate, Label)>, SourceError> {
        self.calls
            .labeler
            .borrow_mut()
            .push((candidates.len(), region.clone()));
        Ok(self.labels.clone())
    }
}

/// Hands out its resources on the first `initialize` and counts every call.
struct FakeFactory {
    resources: RefCell<Option<Resources>>,
    initialized: Rc<Cell<usize>>,
}

impl ProcessorFactory for FakeFactory {
    fn initialize(&self, _options: &ProcessorOptions) -> Result<Resources, SourceError> {
        self.initialized.set(self.initialized.get() + 1);
        self.resources
            .borrow_mut()
            .take()
            .ok_or_else(|| SourceError::Open {
                what: "resources".to_string(),
                reason: "already taken".to_string(),
            })
    }
}

struct Setup {
    reads: Vec<Read>,
    candidates: Vec<Candidate>,
    gvcf_records: Vec<GvcfRecord>,
    images: BTreeMap<u64, Vec<PileupImage>>,
    labels: Vec<(Candidate, Label)>,
    population: Option<PopulationVcf>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            reads: vec![read("r1", 0, "ACGTACGTAC"), read("r2", 4, "ACGTACGTAC")],
            candidates: Vec::new(),
            gvcf_records: Vec::new(),
            images: BTreeMap::new(),
            labels: Vec::new(),
            population: None,
        }
    }
}

impl Setup {
    fn resources(self, calls: &Calls) -> Resources {
        Resources {
            read_sources: vec![Box::new(FakeReads {
                reads: self.reads,
                calls: calls.clone(),
            })],
            reads_cache: InMemoryReads::new(),
            realigner: Some(Box::new(FakeRealigner {
                calls: calls.clone(),
            })),
            variant_caller: Box::new(FakeCaller {
                candidates: self.candidates,
                gvcf_records: self.gvcf_records,
                calls: calls.clone(),
            }),
            pileup_image: Box::new(FakePileup {
                images: self.images,
                calls: calls.clone(),
            }),
            labeler: Some(Box::new(FakeLabeler {
                labels: self.labels,
                calls: calls.clone(),
            })),
            reference: Box::new(InMemoryReference::from_sequences([("chr1", chr1())])),
            population: self
                .population
                .map(|p| Box::new(p) as Box<dyn PopulationSource>),
        }
    }

    fn processor(self, options: ProcessorOptions) -> (RegionProcessor, Calls, Rc<Cell<usize>>) {
        let calls = Calls::default();
        let initialized = Rc::new(Cell::new(0));
        let factory = FakeFactory {
            resources: RefCell::new(Some(self.resources(&calls))),
            initialized: Rc::clone(&initialized),
        };
        (
            RegionProcessor::new(options, Box::new(factory)),
            calls,
            initialized,
        )
    }
}

fn options(mode: Mode) -> ProcessorOptions {
    ProcessorOptions {
        mode,
        sample_name: SAMPLE.to_string(),
        ..ProcessorOptions::default()
    }
}

fn image(alt: &str, byte: u8) -> PileupImage {
    (vec![alt.to_string()], vec![byte])
}

#[test]
fn test_initializes_once_on_demand() {
    let (mut processor, _, initialized) = Setup::default().processor(options(Mode::Calling));
    assert!(!processor.is_initialized());

    processor.process(&region()).unwrap();
    assert!(processor.is_initialized());
    processor.process(&region()).unwrap();
    assert_eq!(initialized.get(), 1);
}

#[test]
fn test_failed_initialization_leaves_processor_uninitialized() {
    let factory = FakeFactory {
        resources: RefCell::new(None),
        initialized: Rc::new(Cell::new(0)),
    };
    let mut processor = RegionProcessor::new(options(Mode::Calling), Box::new(factory));
    assert!(matches!(
        processor.process(&region()),
        Err(ProcessError::Source(SourceError::Open { .. }))
    ));
    assert!(!processor.is_initialized());
}

#[test]
fn test_no_candidates() {
    let setup = Setup {
        reads: Vec::new(),
        ..Setup::default()
    };
    let (mut processor, calls, _) = setup.processor(options(Mode::Training));

    let output = processor.process(&region()).unwrap();
    assert!(output.candidates.is_empty());
    assert!(output.examples.is_empty());
    assert!(output.gvcf_records.is_empty());
    assert_eq!(output.num_reads, 0);
    assert_eq!(calls.reads_queries.borrow().as_slice(), &[region()]);
    // Without reads no allele counter is built and the caller is never asked.
    assert!(calls.caller.borrow().is_empty());
    assert!(calls.pileup.borrow().is_empty());
    assert!(calls.labeler.borrow().is_empty());
}

#[test]
fn test_keeps_ordering_of_candidates_and_examples() {
    for mode in [Mode::Calling, Mode::Training] {
        let images = BTreeMap::from([
            (12, vec![image("C", 1)]),
            (20, vec![image("C", 2), image("C", 3)]),
        ]);
        let setup = Setup {
            candidates: vec![candidate(12), candidate(20)],
            images,
            labels: vec![
                (candidate(12), label(12, vec![0, 1])),
                (candidate(20), label(20, vec![1, 1])),
            ],
            ..Setup::default()
        };
        let (mut processor, calls, _) = setup.processor(options(mode));

        let output = processor.process(&region()).unwrap();
        assert_eq!(output.candidates, vec![candidate(12), candidate(20)]);
        let images: Vec<u8> = output.examples.iter().map(|e| e.encoded_image[0]).collect();
        assert_eq!(images, vec![1, 2, 3]);
        let starts: Vec<u64> = calls.pileup.borrow().iter().map(|(s, _)| *s).collect();
        assert_eq!(starts, vec![12, 20]);

        match mode {
            Mode::Calling => {
                assert!(calls.labeler.borrow().is_empty());
                assert!(output.examples.iter().all(|e| e.label.is_none()));
            }
            Mode::Training => {
                assert_eq!(calls.labeler.borrow().as_slice(), &[(2, region())]);
                let labels: Vec<Option<u8>> = output.examples.iter().map(|e| e.label).collect();
                assert_eq!(labels, vec![Some(1), Some(2), Some(2)]);
                assert_eq!(output.examples[2].variant.genotype, vec![1, 1]);
            }
        }
    }
}

#[test]
fn test_training_drops_examples_of_unlabeled_candidates() {
    let setup = Setup {
        candidates: vec![candidate(12), candidate(20)],
        images: BTreeMap::from([(12, vec![image("C", 1)]), (20, vec![image("C", 2)])]),
        labels: vec![(candidate(20), label(20, vec![0, 1]))],
        ..Setup::default()
    };
    let (mut processor, _, _) = setup.processor(options(Mode::Training));

    let output = processor.process(&region()).unwrap();
    assert_eq!(output.candidates.len(), 2);
    assert_eq!(output.examples.len(), 1);
    assert_eq!(output.examples[0].encoded_image, vec![2]);
}

#[test]
fn test_non_confident_label_is_fatal() {
    let mut unsure = label(12, vec![0, 1]);
    unsure.is_confident = false;
    let setup = Setup {
        candidates: vec![candidate(12)],
        images: BTreeMap::from([(12, vec![image("C", 1)])]),
        labels: vec![(candidate(12), unsure)],
        ..Setup::default()
    };
    let (mut processor, _, _) = setup.processor(options(Mode::Training));

    let err = processor.process(&region()).unwrap_err();
    assert_eq!(err.to_string(), "Cannot add a non-confident label to an example");
}

#[test]
fn test_realigner_runs_only_when_enabled() {
    for enabled in [false, true] {
        let (mut processor, calls, _) = Setup::default().processor(ProcessorOptions {
            realigner_enabled: enabled,
            ..options(Mode::Calling)
        });
        processor.process(&region()).unwrap();

        let expected = if enabled { vec![(2, region())] } else { Vec::new() };
        assert_eq!(*calls.realigned.borrow(), expected);
    }
}

#[test]
fn test_candidates_in_region_counts_every_read() {
    for include_gvcfs in [false, true] {
        let gvcf = GvcfRecord {
            contig: "chr1".to_string(),
            start: 0,
            end: 1,
            ref_base: "A".to_string(),
            ref_support: 1,
            total: 1,
        };
        let setup = Setup {
            candidates: vec![candidate(12)],
            gvcf_records: vec![gvcf.clone()],
            ..Setup::default()
        };
        let calls = Calls::default();
        let reads = setup.reads.clone();
        let mut resources = setup.resources(&calls);
        resources.reads_cache.replace_reads(reads);

        let options = ProcessorOptions {
            include_gvcfs,
            ..options(Mode::Calling)
        };
        let (candidates, gvcfs) = candidates_in_region(&resources, &options, &region()).unwrap();

        assert_eq!(candidates, vec![candidate(12)]);
        assert_eq!(gvcfs, if include_gvcfs { vec![gvcf] } else { Vec::new() });
        assert_eq!(*calls.caller.borrow(), vec![(2, include_gvcfs)]);
    }
}

#[test]
fn test_create_pileup_examples() {
    let setup = Setup {
        images: BTreeMap::from([(12, vec![image("C", 1), image("G", 2)])]),
        ..Setup::default()
    };
    let calls = Calls::default();
    let reads = setup.reads.clone();
    let mut resources = setup.resources(&calls);
    resources.reads_cache.replace_reads(reads);
    let options = options(Mode::Calling);

    let multi = Candidate::new(Variant::new("chr1", 12, "A", ["C", "G"]));
    let examples = create_pileup_examples(&resources, &options, &multi).unwrap();
    assert_eq!(examples.len(), 2);
    for (example, (alt, byte)) in examples.iter().zip([("C", 1), ("G", 2)]) {
        assert_eq!(example.variant, multi.variant);
        assert_eq!(example.alt_alleles, vec![alt.to_string()]);
        assert_eq!(example.encoded_image, vec![byte]);
        assert_eq!(example.image_shape, vec![5, 5, 7]);
        assert_eq!(example.image_format, "raw");
    }
    // Both cached reads are within the pileup window.
    assert_eq!(calls.pileup.borrow().as_slice(), &[(12, 2)]);

    // No image for this candidate.
    let examples = create_pileup_examples(&resources, &options, &candidate(52)).unwrap();
    assert!(examples.is_empty());
}

#[test]
fn test_pileup_gets_alt_haplotypes() {
    let setup = Setup {
        images: BTreeMap::from([(12, vec![image("C", 1)])]),
        ..Setup::default()
    };
    let calls = Calls::default();
    let reads = setup.reads.clone();
    let mut resources = setup.resources(&calls);
    resources.reads_cache.replace_reads(reads);

    for alt_aligned_pileup in [false, true] {
        let options = ProcessorOptions {
            pileup_half_window: 3,
            alt_aligned_pileup,
            ..options(Mode::Calling)
        };
        create_pileup_examples(&resources, &options, &candidate(12)).unwrap();
    }

    let haplotypes = calls.haplotypes.borrow();
    let expected = BTreeMap::from([("C".to_string(), "CGTCCGT".to_string())]);
    assert_eq!(haplotypes[0], (expected.clone(), None));
    // Both cached reads start with A, the haplotype with C.
    assert_eq!(haplotypes[1], (expected, Some(BTreeMap::from([("C".to_string(), Vec::new())]))));
    assert_eq!(
        *calls.aligned.borrow(),
        vec![("CGTCCGT".to_string(), Interval::new("chr1", 9, 16).unwrap())]
    );
}

#[test]
fn test_pileup_candidate_reference_mismatch() {
    let calls = Calls::default();
    let resources = Setup::default().resources(&calls);

    let wrong = Candidate::new(Variant::new("chr1", 10, "A", ["C"]));
    let err = create_pileup_examples(&resources, &options(Mode::Calling), &wrong).unwrap_err();
    assert!(matches!(err, ProcessError::ReferenceMismatch { .. }));
    assert!(calls.pileup.borrow().is_empty());
}

#[test]
fn test_threshold_caller_end_to_end() {
    // Three reads show G>T at position 6.
    let reads = vec![
        read("a", 0, "ACGTACTTAC"),
        read("b", 2, "GTACTTACGT"),
        read("c", 4, "ACTTACGTAC"),
        read("d", 0, "ACGTACGTAC"),
    ];
    let calls = Calls::default();
    let mut resources = Setup {
        reads,
        ..Setup::default()
    }
    .resources(&calls);
    resources.variant_caller = Box::new(ThresholdCaller::default());
    let factory = FakeFactory {
        resources: RefCell::new(Some(resources)),
        initialized: Rc::new(Cell::new(0)),
    };
    let mut processor = RegionProcessor::new(
        ProcessorOptions {
            include_gvcfs: true,
            ..options(Mode::Calling)
        },
        Box::new(factory),
    );

    let output = processor.process(&region()).unwrap();
    assert_eq!(output.num_reads, 4);
    assert_eq!(output.candidates.len(), 1);
    let candidate = &output.candidates[0];
    assert_eq!(candidate.variant, Variant::new("chr1", 6, "G", ["T"]));
    assert_eq!(candidate.allele_support["T"], vec!["a/0", "b/0", "c/0"]);
    assert_eq!(output.gvcf_records.len(), 99);
}

#[test]
fn test_allele_frequencies_are_added_when_enabled() {
    let population = PopulationVcf::from_reader(
        "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
         chr1\t10\t.\tC\tT\t.\tPASS\tAF=0.25\n"
            .as_bytes(),
    )
    .unwrap();
    // Reference base 9 is C.
    let called = Candidate::new(Variant::new("chr1", 9, "C", ["T"]));

    for enabled in [false, true] {
        let setup = Setup {
            candidates: vec![called.clone()],
            population: Some(population.clone()),
            ..Setup::default()
        };
        let (mut processor, _, _) = setup.processor(ProcessorOptions {
            use_allele_frequency: enabled,
            ..options(Mode::Calling)
        });

        let output = processor.process(&region()).unwrap();
        let frequencies = &output.candidates[0].allele_frequency;
        if enabled {
            assert!((frequencies["T"] - 0.25).abs() < 1e-9);
            assert!((frequencies["C"] - 0.75).abs() < 1e-9);
        } else {
            assert!(frequencies.is_empty());
        }
    }
}

#[test]
fn test_process_regions_in_order() {
    let (mut processor, calls, _) = Setup::default().processor(options(Mode::Calling));
    let regions = vec![
        Interval::new("chr1", 0, 50).unwrap(),
        Interval::new("chr1", 50, 100).unwrap(),
    ];

    let mut profiles = Vec::new();
    let processed = process_regions(&mut processor, &regions, |region, output, profile| {
        assert_eq!(profile.region, region.to_literal());
        assert_eq!(profile.num_candidates, output.candidates.len());
        profiles.push(profile);
    })
    .unwrap();

    assert_eq!(processed, 2);
    assert_eq!(*calls.reads_queries.borrow(), regions);
    let names: Vec<&str> = profiles.iter().map(|p| p.region.as_str()).collect();
    assert_eq!(names, vec!["chr1:1-50", "chr1:51-100"]);
    assert_eq!(profiles[0].num_reads, 2);
    assert_eq!(profiles[1].num_reads, 0);
}

#[test]
fn test_process_regions_stops_at_first_error() {
    let factory = FakeFactory {
        resources: RefCell::new(None),
        initialized: Rc::new(Cell::new(0)),
    };
    let mut processor = RegionProcessor::new(options(Mode::Calling), Box::new(factory));
    let mut seen = 0;
    let result = process_regions(&mut processor, &[region(), region()], |_, _, _| seen += 1);
    assert!(result.is_err());
    assert_eq!(seen, 0);
}
