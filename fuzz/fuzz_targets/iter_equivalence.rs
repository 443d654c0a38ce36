#![no_main]

use cordyceps_avl::model::IterEquivalenceInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: IterEquivalenceInput| {
    cordyceps_avl::model::run_iter_equivalence(input.values, input.ops);
});
