//! Whole-stream color grades.

use slidecast_effects::ColorGrade;

/// ffmpeg filter chain implementing a color grade.
pub fn grade_filter(grade: ColorGrade) -> &'static str {
    match grade {
        ColorGrade::Vintage => "curves=preset=vintage",
        ColorGrade::Sepia => {
            "colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131"
        }
        ColorGrade::BlackWhite => "hue=s=0",
        ColorGrade::HighContrast => "eq=contrast=1.5",
        ColorGrade::LowContrast => "eq=contrast=0.7",
        ColorGrade::Warm => "colorbalance=rs=0.15:gs=0.05:bs=-0.15",
        ColorGrade::Cool => "colorbalance=rs=-0.15:bs=0.15",
        ColorGrade::Vibrant => "eq=saturation=1.5",
        ColorGrade::Desaturated => "eq=saturation=0.5",
        ColorGrade::FilmGrain => "noise=alls=20:allf=t+u",
        ColorGrade::Vignette => "vignette=PI/4",
    }
}
