use change_detection::ChangeDetection;

fn main() {
    // Assets are checked in prebuilt, only rerun when they change
    ChangeDetection::path("../res").generate();
}
