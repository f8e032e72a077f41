fn main() {
    focuslens_lib::run()
}
