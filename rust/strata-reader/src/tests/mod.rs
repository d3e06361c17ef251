mod fixture;


mod driver_pipeline;
