use cascade_imgv::app::App;
use eframe::NativeOptions;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let native_options = eframe::NativeOptions {
        ..NativeOptions::default()
    };

    match eframe::run_native(
        "Cascade Image Viewer",
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc)?))),
    ) {
        Ok(_) => {}
        Err(e) => eprintln!("{e}"),
    }
}
